use lead_capture::config::get_configuration;
use lead_capture::startup::Application;
use lead_capture::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        String::from("lead_capture"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = get_configuration()?;
    let application = Application::build(config).await?;

    application.run_until_stop().await?;

    Ok(())
}
