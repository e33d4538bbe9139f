use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use limiter_service::{
    AppState,
    cache::{Cache, MemoryCache, RedisCache},
    config::{CacheBackend, Config},
    database::{PgTransactionFactory, run_migrations},
    limiter::{LimiterOptions, RateLimitService},
    router::create_router,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
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

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'limiter_service';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 设置缓存
    let cache: Arc<dyn Cache> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(
            RedisCache::open(&config.redis_url).expect("Failed to create Redis client"),
        ),
        CacheBackend::Memory => {
            tracing::warn!("Using in-process cache, counters are not shared between instances");
            Arc::new(MemoryCache::new())
        }
    };
    cache.connect().await.expect("Failed to connect to cache");

    let options = LimiterOptions::from(&config);
    tracing::info!(
        "Rate limit window {:?}, default limit {}, write-through {}",
        options.window,
        options.default_limit,
        options.write_through_on_hit
    );
    let limiter = RateLimitService::new(
        Arc::new(PgTransactionFactory::new(pool.clone())),
        cache.clone(),
        options,
    );

    // 设置应用状态
    let state = AppState {
        config: Arc::new(config.clone()),
        limiter: Arc::new(limiter),
    };

    let app = create_router(state);

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
        app,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if let Err(e) = cache.disconnect().await {
        tracing::warn!("Failed to disconnect cache: {}", e);
    }
    pool.close().await;
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
