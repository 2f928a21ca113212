use std::str::FromStr;

use crate::error::IdentityError;
use crate::stats::{PlatformIdentity, PlatformName};

/// user_platforms 表的一行
///
/// ```sql
/// CREATE TABLE user_platforms (
///     user_id  TEXT NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
///     platform TEXT NOT NULL,
///     username TEXT NOT NULL DEFAULT '',
///     profile  TEXT,
///     PRIMARY KEY (user_id, platform)
/// );
/// ```
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformAccountEntity {
    pub platform: String,
    pub username: String,
    pub profile: Option<String>,
}

impl TryFrom<PlatformAccountEntity> for PlatformIdentity {
    type Error = IdentityError;

    fn try_from(row: PlatformAccountEntity) -> Result<Self, Self::Error> {
        Ok(PlatformIdentity {
            platform: PlatformName::from_str(&row.platform)?,
            username: row.username,
            profile: row.profile,
        })
    }
}
