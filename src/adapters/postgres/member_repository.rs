use crate::domain::member::Member;
use crate::domain::value_objects::MemberId;
use crate::ports::{MemberRepository as MemberRepositoryTrait, RepositoryError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

const SELECT_MEMBERS: &str = r#"
    SELECT
        member_id,
        last_name,
        first_name,
        email,
        phone,
        active,
        registered_at
    FROM members
"#;

/// PostgreSQLの行データをMemberに変換する
fn map_row_to_member(row: &PgRow) -> Result<Member> {
    Ok(Member {
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        active: row.try_get("active")?,
        registered_at: row.try_get("registered_at")?,
    })
}

/// MemberRepositoryのPostgreSQL実装
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepositoryTrait for MemberRepository {
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(&format!("{SELECT_MEMBERS} WHERE member_id = $1"))
            .bind(member_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!("{SELECT_MEMBERS} ORDER BY registered_at DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_member).collect()
    }

    async fn create(&self, member: &Member) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO members (
                member_id,
                last_name,
                first_name,
                email,
                phone,
                active,
                registered_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.last_name)
        .bind(&member.first_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(member.active)
        .bind(member.registered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET last_name = $2,
                first_name = $3,
                email = $4,
                phone = $5,
                active = $6
            WHERE member_id = $1
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.last_name)
        .bind(&member.first_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(member.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, member_id: MemberId) -> Result<()> {
        let result = sqlx::query("DELETE FROM members WHERE member_id = $1")
            .bind(member_id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count(&self, active_only: bool) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE ($1 = FALSE OR active)")
                .bind(active_only)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }
}
