use crate::domain::loan::LoanPolicy;
use crate::ports::{BookRepository, LoanRepository, MemberRepository, ReservationRepository};
use std::sync::Arc;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、アプリケーション層の関数に引数として渡す。
/// 永続化は差し替え可能なポートとして注入する（テストではインメモリ実装）。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub members: Arc<dyn MemberRepository>,
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub loan_policy: LoanPolicy,
}
