mod error;
pub mod book_repository;
pub mod loan_repository;
pub mod member_repository;
pub mod reservation_repository;

// パブリックに型を再エクスポート
pub use book_repository::BookRepository as PostgresBookRepository;
pub use loan_repository::LoanRepository as PostgresLoanRepository;
pub use member_repository::MemberRepository as PostgresMemberRepository;
pub use reservation_repository::ReservationRepository as PostgresReservationRepository;

use crate::application::ServiceDependencies;
use crate::domain::loan::LoanPolicy;
use sqlx::PgPool;
use std::sync::Arc;

/// すべてのリポジトリポートを同じコネクションプールのPostgreSQL実装に接続する
pub fn service_dependencies(pool: PgPool, loan_policy: LoanPolicy) -> ServiceDependencies {
    ServiceDependencies {
        members: Arc::new(PostgresMemberRepository::new(pool.clone())),
        books: Arc::new(PostgresBookRepository::new(pool.clone())),
        loans: Arc::new(PostgresLoanRepository::new(pool.clone())),
        reservations: Arc::new(PostgresReservationRepository::new(pool)),
        loan_policy,
    }
}
