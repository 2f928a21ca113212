use axum::extract::{Extension, Json, State};

use crate::{
    AppState,
    error::AppError,
    stats::AggregateSnapshot,
    utils::{ApiResponse, Claims, success_to_api_response},
};

use super::model::{AccountsResponse, SaveAccountsRequest, SaveAccountsResponse};

#[axum::debug_handler]
pub async fn get_stats(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AggregateSnapshot>>, AppError> {
    let snapshot = state.stats.get_stats(&claims.sub).await?;
    Ok(success_to_api_response(snapshot))
}

#[axum::debug_handler]
pub async fn get_accounts(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AccountsResponse>>, AppError> {
    let identities = state
        .identities
        .load(&claims.sub)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(success_to_api_response(AccountsResponse::from_identities(identities)))
}

#[axum::debug_handler]
pub async fn save_accounts(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<SaveAccountsRequest>,
) -> Result<Json<ApiResponse<SaveAccountsResponse>>, AppError> {
    let identities = req.into_identities().map_err(AppError::Validation)?;

    if !state.identities.save(&claims.sub, &identities).await? {
        return Err(AppError::UserNotFound);
    }

    // 账号变了，旧快照作废
    state.stats.invalidate(&claims.sub).await;
    tracing::info!("User {} updated {} platform accounts", claims.sub, identities.len());

    Ok(success_to_api_response(SaveAccountsResponse {
        message: "Saved".to_string(),
    }))
}
