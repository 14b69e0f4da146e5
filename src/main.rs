// src/main.rs

use dotenvy::dotenv;
use mar_backend::config::Config;
use mar_backend::credentials::ServiceRoleStore;
use mar_backend::routes;
use mar_backend::seed::{definition, run_recovery};
use mar_backend::state::AppState;
use mar_backend::utils::hash::hash_password;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed Admin User
    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Seed quiz content on an empty database
    if let Err(e) = seed_quiz_if_missing(&pool).await {
        tracing::error!("Failed to check quiz content: {:?}", e);
    }

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        service_roles: ServiceRoleStore::file(config.credential_store_path.clone()),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

async fn seed_admin_user(pool: &PgPool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let email = email.trim().to_lowercase();
        let existing = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM auth_users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?;

        if existing.is_none() {
            tracing::info!("Seeding admin user: {}", email);
            let hashed_password = hash_password(password)?;

            let mut tx = pool.begin().await?;
            let id = sqlx::query_scalar::<_, uuid::Uuid>(
                "INSERT INTO auth_users (email, password_hash) VALUES ($1, $2) RETURNING id",
            )
            .bind(&email)
            .bind(&hashed_password)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, 'admin')")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}

async fn seed_quiz_if_missing(pool: &PgPool) -> Result<(), sqlx::Error> {
    let questions = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_questions")
        .fetch_one(pool)
        .await?;

    if questions != definition::EXPECTED_QUESTIONS as i64 {
        tracing::warn!(
            "Quiz has {} questions, expected {}; recovering",
            questions,
            definition::EXPECTED_QUESTIONS
        );
        let report = run_recovery(pool).await;
        if !report.success {
            tracing::error!("Startup quiz recovery failed: {:?}", report.error);
        }
    }
    Ok(())
}
