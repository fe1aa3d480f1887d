use chatflow_client::{init_tracing, run, ClientConfig, SessionEnd};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    tracing::info!(?config, "Loaded configuration");

    match run(config).await? {
        SessionEnd::RedirectToLogin => {
            anyhow::bail!("authentication required, sign in and restart the client")
        }
        SessionEnd::Logout | SessionEnd::InputClosed => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
