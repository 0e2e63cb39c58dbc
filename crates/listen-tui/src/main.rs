use listen_tui::app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = listen_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("listen.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP and websocket internals quiet by default.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=info".to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("listen log: {}", log_path.display());

    tracing::info!("listen starting…");

    let config = match listen_proto::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config unreadable, using defaults: {:#}", e);
            listen_proto::config::Config::default()
        }
    };

    let result = App::new(config).run().await;
    if let Err(e) = &result {
        tracing::error!("listen exited with error: {:#}", e);
    }
    tracing::info!("listen stopped");
    result
}
