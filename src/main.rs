use sevenarts_digest::config::get_configuration;
use sevenarts_digest::startup::Application;
use sevenarts_digest::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        String::from("sevenarts_digest"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber)?;

    let config = get_configuration()?;
    let application = Application::build(config).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    application.run_until_stop().await?;

    Ok(())
}
