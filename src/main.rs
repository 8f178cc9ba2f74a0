use actix_web::{App, HttpServer};
use std::sync::Arc;

use blog_service::cache::{MemoryPageCache, PageCache, RedisPageCache};
use blog_service::cli::{self, Command};
use blog_service::db::{create_pool, run_migrations, BlogRepository, MemoryRepository, PgRepository};
use blog_service::middleware::ViewerMiddleware;
use blog_service::routes::configure_routes;
use blog_service::{init_logging, AppState, Config};

/// `DATABASE_URL` scheme selecting the in-process repository
const MEMORY_DATABASE_PREFIX: &str = "memory:";

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn setup_repository(config: &Config) -> anyhow::Result<Arc<dyn BlogRepository>> {
    if config.database.url.starts_with(MEMORY_DATABASE_PREFIX) {
        tracing::warn!("using in-process repository; data is lost on exit");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let pool = create_pool(&config.database).await?;
    tracing::info!(
        "Database pool created with {} max connections",
        config.database.max_connections
    );
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(Arc::new(PgRepository::new(pool)))
}

async fn setup_page_cache(config: &Config) -> Arc<dyn PageCache> {
    match &config.cache.url {
        Some(url) => match RedisPageCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("Redis page cache connected");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable ({}), falling back to in-process page cache", e);
                Arc::new(MemoryPageCache::new())
            }
        },
        None => Arc::new(MemoryPageCache::new()),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    let command = Command::parse(std::env::args().skip(1))?;
    if command != Command::Serve {
        return cli::run(command, &config).await;
    }

    tracing::info!("Starting blog-service ({})", config.app.env);

    let repo = setup_repository(&config).await?;
    let page_cache = setup_page_cache(&config).await;

    let bind = (config.app.host.clone(), config.app.port);
    let workers = config.app.workers;
    let state = AppState::new(config, repo, page_cache);

    tracing::info!("HTTP server listening on {}:{}", bind.0, bind.1);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(ViewerMiddleware::new(
                state.tokens.clone(),
                state.repo.clone(),
            ))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| configure_routes(cfg, &state))
    })
    .workers(workers)
    .disable_signals()
    .bind(bind)?
    .run();

    let handle = server.handle();
    let shutdown = shutdown_signal();
    tokio::pin!(server);
    tokio::pin!(shutdown);

    tokio::select! {
        result = &mut server => result?,
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            handle.stop(true).await;
            server.await?;
        }
    }

    tracing::info!("blog-service shutting down");
    Ok(())
}
