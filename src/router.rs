use axum::{
    Router,
    routing::get,
};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors},
    routes,
};

// 仪表盘相关的路由，全部需要认证
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(routes::dashboard::get_stats))
        .route(
            "/dashboard/accounts",
            get(routes::dashboard::get_accounts).post(routes::dashboard::save_accounts),
        )
        .layer(axum::middleware::from_fn_with_state(state, auth_middleware))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let base = state.config.api_base_uri.trim_end_matches('/');
    let api = dashboard_routes(state.clone());

    // axum 不允许在根路径 nest
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
