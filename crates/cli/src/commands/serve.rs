//! `agrisense serve` — Start the HTTP backend.

use agrisense_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("AgriSense backend");
    println!("  Listening: {}:{}", config.server.host, config.server.port);
    println!("  Device:    {}", config.device.url);
    println!("  Model:     {}", config.provider.model);

    agrisense_gateway::start(config).await?;

    Ok(())
}
