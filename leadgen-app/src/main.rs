use clap::Parser;
use leadgen_app::args::Cli;
use leadgen_app::state::AppState;
use leadgen_scanner::JobState;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    leadgen_app::init_tracing(cli.verbose);

    info!("Starting LeadGen v{}", env!("CARGO_PKG_VERSION"));

    let config = leadgen_app::load_config(cli.config.as_deref())?;
    let state = AppState::new(config)?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; never interrupt
            std::future::pending::<()>().await;
        }
    };
    let report = leadgen_app::run_job(&state, cli.to_request(), shutdown).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.job.state == JobState::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
