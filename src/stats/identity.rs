use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::PlatformIdentity;
use crate::error::IdentityError;

/// 用户平台账号的存取
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// 用户不存在时返回 `None`
    async fn load(&self, user_id: &str) -> Result<Option<Vec<PlatformIdentity>>, IdentityError>;

    /// 整体替换用户的平台账号，用户不存在时返回 `false`
    async fn save(&self, user_id: &str, identities: &[PlatformIdentity]) -> Result<bool, IdentityError>;
}

/// 进程内实现，本地运行和测试使用
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, Vec<PlatformIdentity>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册用户（账号可以为空）
    pub fn insert_user(&self, user_id: &str, identities: Vec<PlatformIdentity>) {
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user_id.to_string(), identities);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self, user_id: &str) -> Result<Option<Vec<PlatformIdentity>>, IdentityError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(user_id)
            .cloned())
    }

    async fn save(&self, user_id: &str, identities: &[PlatformIdentity]) -> Result<bool, IdentityError> {
        let mut users = self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match users.get_mut(user_id) {
            Some(existing) => {
                *existing = identities.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
