use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storekeep::infrastructure::AppState;
use storekeep::{config, db, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storekeep=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // Check for --profile CLI argument
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--profile")
        && let Some(val) = args.get(pos + 1)
    {
        // SAFETY: nothing else reads the environment before config is loaded
        unsafe { std::env::set_var("PROFILE", val) };
    }

    let config = config::Config::from_env();
    tracing::info!(
        "Starting storekeep (profile: {}, retry: {} attempts, {:?} base delay)",
        config.profile,
        config.retry.max_attempts,
        config.retry.base_delay
    );

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let state = AppState::new(db, &config).expect("Failed to build entity registry");

    if let Err(e) = server::serve(state, &config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
