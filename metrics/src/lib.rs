pub mod server;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    // Sync
    latest_synced_block: IntGauge,
    blocks_synced: IntCounterVec,
    sync_failures: IntCounterVec,
    block_sync_time: HistogramVec,
    // Pending verification
    pending_records: IntGauge,
    pending_confirmations: IntCounterVec,
    // Client
    transfers: IntCounterVec,
    checkpoints_adopted: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let latest_synced_block = IntGauge::with_opts(Opts::new(
            "plasma_latest_synced_block",
            "Highest block whose state updates have been synced",
        ))?;
        registry.register(Box::new(latest_synced_block.clone()))?;

        let blocks_synced = IntCounterVec::new(
            Opts::new("plasma_blocks_synced_total", "Total number of blocks synced"),
            &["mode"],
        )?;
        registry.register(Box::new(blocks_synced.clone()))?;

        let sync_failures = IntCounterVec::new(
            Opts::new("plasma_sync_failures_total", "Total number of failed sync attempts"),
            &["stage"],
        )?;
        registry.register(Box::new(sync_failures.clone()))?;

        let block_sync_time = HistogramVec::new(
            HistogramOpts::new("plasma_block_sync_time_seconds", "Time taken to sync one block")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 1.0]),
            &[],
        )?;
        registry.register(Box::new(block_sync_time.clone()))?;

        let pending_records = IntGauge::with_opts(Opts::new(
            "plasma_pending_state_updates",
            "State updates awaiting an inclusion proof",
        ))?;
        registry.register(Box::new(pending_records.clone()))?;

        let pending_confirmations = IntCounterVec::new(
            Opts::new("plasma_pending_checks_total", "Inclusion checks of pending state updates"),
            &["result"],
        )?;
        registry.register(Box::new(pending_confirmations.clone()))?;

        let transfers = IntCounterVec::new(
            Opts::new("plasma_transfers_total", "Total number of submitted transfers"),
            &["result"],
        )?;
        registry.register(Box::new(transfers.clone()))?;

        let checkpoints_adopted = IntCounterVec::new(
            Opts::new("plasma_checkpoints_total", "Finalized checkpoints observed"),
            &["result"],
        )?;
        registry.register(Box::new(checkpoints_adopted.clone()))?;

        Ok(Self {
            registry,
            latest_synced_block,
            blocks_synced,
            sync_failures,
            block_sync_time,
            pending_records,
            pending_confirmations,
            transfers,
            checkpoints_adopted,
        })
    }

    pub fn gather(&self) -> Result<String, MetricsError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    // Sync
    pub fn set_latest_synced_block(&self, v: i64) {
        self.latest_synced_block.set(v);
    }

    pub fn inc_blocks_synced(&self, mode: &str) {
        self.blocks_synced.with_label_values(&[mode]).inc();
    }

    pub fn inc_sync_failures(&self, stage: &str) {
        self.sync_failures.with_label_values(&[stage]).inc();
    }

    pub fn observe_block_sync_time(&self, duration: f64) {
        self.block_sync_time.with_label_values::<&str>(&[]).observe(duration);
    }

    // Pending verification
    pub fn set_pending_records(&self, v: i64) {
        self.pending_records.set(v);
    }

    pub fn inc_pending_checks(&self, result: &str) {
        self.pending_confirmations.with_label_values(&[result]).inc();
    }

    // Client
    pub fn inc_transfers(&self, result: &str) {
        self.transfers.with_label_values(&[result]).inc();
    }

    pub fn inc_checkpoints(&self, result: &str) {
        self.checkpoints_adopted.with_label_values(&[result]).inc();
    }
}

pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_plasma_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.set_latest_synced_block(42);
        metrics.inc_blocks_synced("catch_up");
        metrics.inc_transfers("accepted");

        let text = metrics.gather().unwrap();

        assert!(text.contains("plasma_latest_synced_block 42"));
        assert!(text.contains("plasma_blocks_synced_total{mode=\"catch_up\"} 1"));
        assert!(text.contains("plasma_transfers_total{result=\"accepted\"} 1"));
    }
}
