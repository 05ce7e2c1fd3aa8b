// src/db.rs
use crate::config::DatabaseConfig;
use backoff::{future::retry, ExponentialBackoff};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::time::Duration;

/// Build connect options from either `DATABASE_URL` or the individual DB_* settings.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    if let Some(url) = &config.url {
        return url.parse::<PgConnectOptions>();
    }

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .ssl_mode(ssl_mode(config));

    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }

    Ok(options)
}

fn ssl_mode(config: &DatabaseConfig) -> PgSslMode {
    match (config.encrypt, config.trust_server_certificate) {
        (false, _) => PgSslMode::Prefer,
        (true, true) => PgSslMode::Require,
        (true, false) => PgSslMode::VerifyFull,
    }
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect_with(connect_options(config)?)
        .await?;

    // Run migrations on startup
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create the pool, retrying with exponential backoff while the database is unreachable.
///
/// Configuration mistakes (bad credentials, unknown database, failed migrations)
/// are not retried.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let backoff_config = ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(10),
        multiplier: 2.0,
        max_elapsed_time: Some(Duration::from_secs(60)),
        ..Default::default()
    };

    let operation = || async move {
        create_pool(config).await.map_err(|e| {
            if is_transient(&e) {
                tracing::warn!("Database not reachable yet (retrying): {}", e);
                backoff::Error::transient(e)
            } else {
                tracing::error!("Database connection failed: {}", e);
                backoff::Error::permanent(e)
            }
        })
    };

    retry(backoff_config, operation).await
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Periodically probe the pool and log when the database goes away or comes back.
///
/// sqlx replaces broken connections on its own; this task only makes the
/// outage visible instead of surfacing it first as a failed chat request.
pub fn spawn_pool_supervisor(pool: PgPool, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut healthy = true;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                tracing::info!("Database pool closed, stopping supervisor");
                break;
            }

            match sqlx::query("SELECT 1").execute(&pool).await {
                Ok(_) if !healthy => {
                    healthy = true;
                    tracing::info!("✅ Database connection restored");
                }
                Ok(_) => tracing::trace!("Database health check ok"),
                Err(e) if healthy => {
                    healthy = false;
                    tracing::error!("❌ Database health check failed: {}", e);
                }
                Err(e) => tracing::debug!("Database still unavailable: {}", e),
            }
        }
    })
}
