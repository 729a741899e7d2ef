use anyhow::Result;
use tracing_subscriber::EnvFilter;
use vinyl_core::VinylConfig;
use vinyl_server::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = VinylConfig::new();
    config.load_env("VINYL__");
    let settings = Settings::from_config(&config.snapshot())?;

    let app = vinyl_server::build_default(&settings).await?;
    app.listen(settings.http.addr()).await
}
