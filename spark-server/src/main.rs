use clap::Parser;
use spark_core::SparkConfig;
use spark_server::SparkContext;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "spark.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ANTHROPIC_API_KEY, RUST_LOG)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match SparkConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let default_level = config
        .service
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    // Connect to DB
    let pool = match spark_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match spark_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match spark_core::db::check_schema(&pool).await {
            Ok(n) => println!("✅ Spark schema present ({} ideas)", n),
            Err(e) => {
                println!("❌ Schema check failed (run migrations/0001_spark.sql): {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Spark DB health check passed");
        return Ok(());
    }

    if !config.http.enabled {
        tracing::warn!("HTTP API disabled in config; nothing to serve");
        return Ok(());
    }

    let ctx = SparkContext::new(pool, config);

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    spark_server::http::start_http_server(ctx, tx.subscribe()).await?;

    Ok(())
}
