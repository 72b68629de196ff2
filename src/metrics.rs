//! Prometheus metrics

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Setup Prometheus metrics exporter
/// Returns a handle that can be used to retrieve metrics
pub fn setup_metrics() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!("Prometheus metrics exporter installed");

    Ok(handle)
}

/// Record a completed model load
pub fn record_model_loaded(name: &str) {
    metrics::counter!("mcq_manager_models_loaded_total",
        "model" => name.to_string()
    )
    .increment(1);
}

/// Record a registry scan and how many records it discovered
pub fn record_scan(discovered: usize) {
    metrics::counter!("mcq_manager_scans_total").increment(1);
    metrics::counter!("mcq_manager_scan_discovered_total").increment(discovered as u64);
}

/// Record a generation request and how many sequences it produced
pub fn record_generation(count: usize) {
    metrics::counter!("mcq_manager_generations_total").increment(1);
    metrics::counter!("mcq_manager_generated_sequences_total").increment(count as u64);
}

/// Record a completed fine-tune
pub fn record_fine_tune(model: &str) {
    metrics::counter!("mcq_manager_fine_tunes_total",
        "model" => model.to_string()
    )
    .increment(1);
}

/// Update the registered model count gauge
pub fn update_registered_count(count: usize) {
    metrics::gauge!("mcq_manager_registered_models").set(count as f64);
}
