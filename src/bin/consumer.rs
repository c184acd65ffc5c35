use face_license_scan::{
    app_state::ConsumerState, config::PipelineConfig, pipeline::context::RunContext, telemetry,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = PipelineConfig::from_env();
    telemetry::init_tracing(config.as_ref().map(|c| c.log_json).unwrap_or(false));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(addr) = config.metrics_addr {
        match telemetry::install_metrics_exporter(addr) {
            Ok(()) => tracing::info!(%addr, "Serving Prometheus metrics"),
            Err(e) => tracing::warn!(error = %e, "Metrics exporter unavailable"),
        }
    }

    tracing::info!(output = %config.output_path.display(), "Starting text extraction consumer");

    let state = match ConsumerState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize services");
            return ExitCode::FAILURE;
        }
    };

    let consumer = match state.consumer(&config).await {
        Ok(consumer) => consumer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to prepare consumer");
            return ExitCode::FAILURE;
        }
    };

    let (ctx, stop) = RunContext::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current message");
            stop.stop();
        }
    });

    match consumer.run(&ctx).await {
        Ok(report) => {
            tracing::info!(
                processed = report.processed,
                matched = report.matched,
                failed = report.failed,
                stop = ?report.stop,
                "Consumer finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Consumer failed");
            ExitCode::FAILURE
        }
    }
}
