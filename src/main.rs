use anyhow::Result;
use tls_relay::{Relay, load_config, tls};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let acceptor = match &config.listen.tls {
        Some(tls_config) => Some(tls::acceptor(tls::load_tls_config(tls_config)?)),
        None => None,
    };

    info!(
        config_file = "config.toml",
        listen_addr = %config.listen.addr(),
        backend_addr = %config.backend.addr(),
        tls = acceptor.is_some(),
        "Configuration loaded"
    );

    let mut relay = Relay::bind(&config.listen.addr(), &config.backend.addr(), acceptor).await?;
    info!(listen_addr = %relay.local_addr(), "Relay listening");

    tokio::select! {
        result = relay.join() => return result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    relay.shutdown();
    relay.join().await
}
