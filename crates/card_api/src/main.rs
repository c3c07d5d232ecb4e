use card_api::create_app;
use card_core::StateMap;
use card_engine::TransitMessagesCard;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the transit-card preview server
#[derive(Parser, Debug)]
#[command(name = "transit-card")]
#[command(about = "Preview host for the transit messages card")]
struct Args {
    /// Path to the card configuration JSON file
    #[arg(short, long)]
    config: PathBuf,

    /// Optional path to a demo host-state snapshot JSON file
    #[arg(short, long)]
    states: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(short, long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt().pretty().init();

    // Load the card configuration from the JSON file
    let config_content = tokio::fs::read_to_string(&args.config).await.map_err(|e| {
        format!(
            "Failed to read config file '{}': {}",
            args.config.display(),
            e
        )
    })?;

    let config_value: serde_json::Value = serde_json::from_str(&config_content).map_err(|e| {
        format!(
            "Failed to parse config file '{}': {}",
            args.config.display(),
            e
        )
    })?;

    let mut card = TransitMessagesCard::new();
    card.set_config(config_value).map_err(|e| {
        format!(
            "Rejected card configuration '{}': {}",
            args.config.display(),
            e
        )
    })?;

    tracing::info!(
        "Configured card from {} (size hint: {} rows)",
        args.config.display(),
        card.card_size()
    );

    // Optionally seed a demo snapshot, as a dashboard would on mount
    if let Some(states_path) = &args.states {
        let states_content = tokio::fs::read_to_string(states_path).await.map_err(|e| {
            format!(
                "Failed to read states file '{}': {}",
                states_path.display(),
                e
            )
        })?;
        let states: StateMap = serde_json::from_str(&states_content).map_err(|e| {
            format!(
                "Failed to parse states file '{}': {}",
                states_path.display(),
                e
            )
        })?;
        tracing::info!(
            "Seeded host-state snapshot from {} ({} entities)",
            states_path.display(),
            states.len()
        );
        card.set_states(states);
    }

    // Build our application with routes
    let app = create_app(card);

    // Run our app with hyper
    let bind_addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
