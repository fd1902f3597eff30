//! Mercato admin API server binary.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use mercato_api::config::ApiConfig;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "mercato_server", about = "Mercato admin API server")]
struct Args {
    /// Port to listen on (0 = use BIND_ADDR / ephemeral).
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/mercato"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mercato_api=debug,mercato_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(database_url = %args.database_url, port = args.port, "starting mercato_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    // Run database migrations.
    info!("running database migrations");
    mercato_api::migrate(&pool).await?;

    let mut config = ApiConfig::from_env();
    config.pg_connection_url = args.database_url.clone();
    if args.port != 0 {
        config.bind_addr = format!("127.0.0.1:{}", args.port);
    }

    // One engine instance for the whole process; request handlers share it
    // behind a read-write lock.
    let enforcer = mercato_core::policy::engine::build_enforcer(pool.clone()).await?;

    let state = mercato_api::AppState::build(
        pool,
        config.clone(),
        mercato_core::policy::engine::share(enforcer),
    )?;

    let app = mercato_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "admin API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
