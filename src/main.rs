use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use statboard::{
    AppState,
    cache::{CacheStore, MemoryCacheStore, RedisCacheStore},
    config::Config,
    database::PlatformAccountRepository,
    fetchers::{FetcherHandle, default_fetchers},
    router::create_router,
    stats::{Aggregator, IdentityStore, StatsCache},
};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'statboard';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    let identities: Arc<dyn IdentityStore> = Arc::new(PlatformAccountRepository::new(pool));

    // 设置缓存，未配置 Redis 时退回进程内缓存
    let store: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            let redis_client = redis::Client::open(url.as_str()).expect("Failed to create Redis client");
            Arc::new(RedisCacheStore::new(
                Arc::new(redis_client),
                config.cache_timeout(),
            ))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process stats cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    // 抓取器共用一个 HTTP 客户端
    let fetcher_handle = Arc::new(FetcherHandle::new(config.fetch_timeout()));
    let aggregator = Aggregator::new(
        default_fetchers(fetcher_handle.clone()),
        config.stats.aggregate_timeout(),
    );
    let stats = Arc::new(StatsCache::new(
        store,
        aggregator,
        identities.clone(),
        config.stats,
    ));

    // 设置应用状态
    let state = AppState {
        config: config.clone(),
        stats: stats.clone(),
        identities,
    };

    let router = create_router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    // 等后台刷新写完再退出
    tracing::info!("Server stopped, waiting for background refreshes");
    stats.shutdown().await;
    fetcher_handle.shutdown();
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
