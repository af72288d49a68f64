use tracing_subscriber::EnvFilter;

fn default_level(debug: bool) -> String {
    if debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("RATE_GATE_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    }
}

/// `RUST_LOG` wins over the computed default.
pub fn init_logging(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("rate-gate: logging already initialized");
    }
}
