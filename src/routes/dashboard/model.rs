use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{PlatformIdentity, PlatformName};

/// 单个平台的账号信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveAccountsRequest {
    pub platforms: BTreeMap<PlatformName, AccountEntry>,
}

#[derive(Debug, Serialize)]
pub struct SaveAccountsResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub platforms: BTreeMap<PlatformName, AccountEntry>,
}

impl AccountsResponse {
    pub fn from_identities(identities: Vec<PlatformIdentity>) -> Self {
        let platforms = identities
            .into_iter()
            .map(|identity| {
                (
                    identity.platform,
                    AccountEntry {
                        username: Some(identity.username),
                        profile: identity.profile,
                    },
                )
            })
            .collect();
        Self { platforms }
    }
}

// 用户名和主页链接的长度上限
pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_PROFILE_LEN: usize = 512;

impl SaveAccountsRequest {
    /// 校验并转换为平台账号列表，空用户名保留为未配置
    pub fn into_identities(self) -> Result<Vec<PlatformIdentity>, String> {
        self.platforms
            .into_iter()
            .map(|(platform, entry)| {
                let username = entry.username.unwrap_or_default().trim().to_string();
                if username.chars().count() > MAX_USERNAME_LEN {
                    return Err(format!("{} 用户名过长", platform));
                }
                if username.chars().any(char::is_whitespace) {
                    return Err(format!("{} 用户名不能包含空白字符", platform));
                }

                let profile = entry
                    .profile
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty());
                if profile.as_ref().is_some_and(|p| p.len() > MAX_PROFILE_LEN) {
                    return Err(format!("{} 主页链接过长", platform));
                }

                Ok(PlatformIdentity {
                    platform,
                    username,
                    profile,
                })
            })
            .collect()
    }
}
