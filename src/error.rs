use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 单个平台抓取失败，聚合时一律按失败处理
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("profile not found")]
    NotFound,
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("fetch timed out")]
    Timeout,
    #[error("fetcher handle is shut down")]
    Closed,
}

/// 缓存存储错误，调用方只记录日志并降级
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// 只出现在后台刷新内部，不会从 get_stats 返回
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// 接口层错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("未授权访问")]
    Unauthorized,
    #[error("用户不存在")]
    UserNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("内部服务器错误")]
    InternalServerError,
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::UserNotFound(_) => AppError::UserNotFound,
            other => {
                tracing::error!("stats request failed: {}", other);
                AppError::InternalServerError
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownPlatform(name) => {
                AppError::Validation(format!("不支持的平台: {}", name))
            }
            IdentityError::Database(e) => {
                tracing::error!("identity store error: {}", e);
                AppError::InternalServerError
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
            ),
        };

        (status, error_to_api_response::<()>(code, self.to_string())).into_response()
    }
}
