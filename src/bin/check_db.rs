use gemini_chat::config::DatabaseConfig;
use gemini_chat::db;
use sqlx::postgres::PgPool;

// Connectivity check for the chat history database, using the server's DB_* settings.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = DatabaseConfig::from_env()?;

    println!("Connecting to database...");
    let pool = PgPool::connect_with(db::connect_options(&config)?).await?;

    // Test 1: Check the chat tables
    for table in ["conversations", "messages"] {
        let result = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await;

        match result {
            Ok(count) => println!("✅ {table} table EXISTS ({count} rows)"),
            Err(e) => println!("❌ {table} table NOT FOUND: {e}"),
        }
    }

    // Test 2: Check _sqlx_migrations table
    println!("\nTesting _sqlx_migrations table...");
    let migrations = sqlx::query_as::<_, (i64, String, bool)>(
        "SELECT version, description, success FROM _sqlx_migrations ORDER BY version DESC",
    )
    .fetch_all(&pool)
    .await;

    match migrations {
        Ok(migrations) => {
            println!("✅ Migrations:");
            for (version, description, success) in migrations {
                println!("  - {} {} (Succeeded: {})", version, description, success);
            }
        }
        Err(e) => println!("❌ Error querying _sqlx_migrations: {}", e),
    }

    Ok(())
}
