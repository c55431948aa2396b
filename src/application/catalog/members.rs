use crate::application::ServiceDependencies;
use crate::domain::member::{Member, MemberUpdate, NewMember};
use crate::domain::value_objects::MemberId;
use crate::ports::RepositoryError;
use chrono::{DateTime, Utc};
use validator::Validate;

use super::errors::{CatalogError, Result};

fn map_write_error(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::UniqueViolation(_) => CatalogError::DuplicateEmail,
        RepositoryError::NotFound => CatalogError::MemberNotFound,
        other => CatalogError::from(other),
    }
}

/// 会員を登録する（有効状態、登録日時 = now）
pub async fn register_member(
    deps: &ServiceDependencies,
    input: NewMember,
    now: DateTime<Utc>,
) -> Result<Member> {
    input.validate()?;

    let member = Member::register(input, now);
    deps.members.create(&member).await.map_err(map_write_error)?;

    tracing::info!(member_id = %member.member_id, "Member registered");
    Ok(member)
}

pub async fn list_members(deps: &ServiceDependencies) -> Result<Vec<Member>> {
    Ok(deps.members.list().await?)
}

pub async fn get_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Member> {
    deps.members
        .find_by_id(member_id)
        .await?
        .ok_or(CatalogError::MemberNotFound)
}

/// 会員情報を部分更新する
///
/// `active = false`で貸出権限を取り消す。
pub async fn update_member(
    deps: &ServiceDependencies,
    member_id: MemberId,
    update: MemberUpdate,
) -> Result<Member> {
    update.validate()?;

    let member = get_member(deps, member_id).await?.apply(update);
    deps.members.update(&member).await.map_err(map_write_error)?;

    Ok(member)
}

/// 会員を削除する。貸出記録がある場合は削除不可（予約は連鎖削除）。
pub async fn delete_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<()> {
    deps.members
        .delete(member_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::MemberNotFound,
            RepositoryError::ForeignKeyViolation(_) => CatalogError::MemberHasLoans,
            other => CatalogError::from(other),
        })?;

    tracing::info!(%member_id, "Member deleted");
    Ok(())
}
