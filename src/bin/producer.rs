use face_license_scan::{app_state::ProducerState, config::PipelineConfig, telemetry};
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

    tracing::info!(
        pool_size = config.pool_size,
        sample_size = config.sample_size,
        "Starting face scan producer"
    );

    let state = match ProducerState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize services");
            return ExitCode::FAILURE;
        }
    };

    match state.producer(&config).run().await {
        Ok(report) => {
            tracing::info!(
                group_id = %report.group_id,
                sampled = report.sampled.len(),
                enqueued = report.enqueued.len(),
                failed = report.failed.len(),
                "Producer finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Producer failed");
            ExitCode::FAILURE
        }
    }
}
