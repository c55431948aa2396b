use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::value_objects::ReservationId;
use async_trait::async_trait;

use super::Result;

/// 予約リポジトリポート
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    /// 予約日の新しい順
    async fn list(&self, status: Option<ReservationStatus>) -> Result<Vec<Reservation>>;

    /// 会員・書籍が存在しない場合は`ForeignKeyViolation`
    async fn create(&self, reservation: &Reservation) -> Result<()>;

    async fn update_status(
        &self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()>;
}
