use shesecures::{WizardConfig, WizardController, driver};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = WizardConfig::from_env().expect("invalid wizard configuration");
    tracing::info!(
        submit_delay_ms = config.submit_delay_ms,
        submit_timeout_ms = config.submit_timeout_ms,
        mock_failure_rate = config.mock_failure_rate,
        "incident wizard ready"
    );

    let controller = WizardController::from_config(&config);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    if let Err(e) = driver::run(&controller, stdin, tokio::io::stdout()).await {
        tracing::error!(error = %e, "driver stopped");
        std::process::exit(1);
    }
}
