use crate::domain::member::Member;
use crate::domain::value_objects::MemberId;
use async_trait::async_trait;

use super::Result;

/// 会員リポジトリポート
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>>;

    /// 登録日の新しい順
    async fn list(&self) -> Result<Vec<Member>>;

    /// emailが重複する場合は`UniqueViolation`
    async fn create(&self, member: &Member) -> Result<()>;

    /// 存在しない場合は`NotFound`
    async fn update(&self, member: &Member) -> Result<()>;

    /// 貸出が参照している場合は`ForeignKeyViolation`。予約は連鎖削除される。
    async fn delete(&self, member_id: MemberId) -> Result<()>;

    async fn count(&self, active_only: bool) -> Result<u64>;
}
