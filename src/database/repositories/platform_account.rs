use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::PlatformAccountEntity;
use crate::error::IdentityError;
use crate::stats::{IdentityStore, PlatformIdentity};

/// 平台账号存储库实现
#[derive(Clone)]
pub struct PlatformAccountRepository {
    pool: PgPool,
}

impl PlatformAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl IdentityStore for PlatformAccountRepository {
    async fn load(&self, user_id: &str) -> Result<Option<Vec<PlatformIdentity>>, IdentityError> {
        if !self.user_exists(user_id).await? {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, PlatformAccountEntity>(
            r#"
            SELECT platform, username, profile
            FROM user_platforms
            WHERE user_id = $1
            ORDER BY platform
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut identities = Vec::with_capacity(rows.len());
        for row in rows {
            // 已下线的平台直接跳过
            match PlatformIdentity::try_from(row) {
                Ok(identity) => identities.push(identity),
                Err(e) => tracing::warn!("skipping stored account of user {}: {}", user_id, e),
            }
        }

        Ok(Some(identities))
    }

    async fn save(&self, user_id: &str, identities: &[PlatformIdentity]) -> Result<bool, IdentityError> {
        if !self.user_exists(user_id).await? {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_platforms WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for identity in identities {
            sqlx::query(
                r#"
                INSERT INTO user_platforms (user_id, platform, username, profile)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(identity.platform.as_str())
            .bind(identity.username.trim())
            .bind(identity.profile.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Saved {} platform accounts for user {}", identities.len(), user_id);

        Ok(true)
    }
}
