use gemini_chat::config::Config;
use gemini_chat::gemini_client::GeminiClient;
use gemini_chat::store::PgConversationStore;
use gemini_chat::{app, db, AppState, ChatOrchestrator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // A missing Gemini key is fatal; nothing else can be served without it
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("FATAL ERROR: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Configuration - Gemini model: {}, database: {}, encrypt: {}",
        config.gemini.model,
        config
            .database
            .url
            .as_ref()
            .map(|_| "DATABASE_URL".to_string())
            .unwrap_or_else(|| format!("{}:{}", config.database.host, config.database.port)),
        config.database.encrypt
    );

    let db_pool = db::connect_with_retry(&config.database)
        .await
        .expect("Failed to create database pool.");
    tracing::info!("Connected to PostgreSQL");

    db::spawn_pool_supervisor(db_pool.clone(), Duration::from_secs(30));

    tracing::info!("Initializing Gemini AI client ({})...", config.gemini.model);
    let gemini_client = GeminiClient::new(&config.gemini).expect("Failed to build Gemini client");

    let orchestrator = ChatOrchestrator::new(
        Arc::new(PgConversationStore::new(db_pool)),
        Arc::new(gemini_client),
    );
    let shared_state = Arc::new(AppState { orchestrator });

    let app = app(shared_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("Failed to bind listen port");
    tracing::info!("Server listening at http://{}", listener.local_addr().expect("bound address"));
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .expect("Server error");
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,gemini_chat=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,gemini_chat=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("💬 Gemini chat starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });

    Ok(())
}
