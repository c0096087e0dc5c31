use crate::core::{Pipeline, RunReport};
use crate::utils::error::Result;
use crate::utils::monitor::ProcessMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: ProcessMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ProcessMonitor::new(monitor_enabled),
        }
    }

    /// Run one full batch. Each stage completes before the next starts; only
    /// input/output failures abort the run.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Starting holdings export");

        let extracted = self.pipeline.extract().await?;
        self.monitor.log_phase("extract");
        let mut report = RunReport {
            identifiers: extracted.identifiers,
            holding_references: extracted.holding_references,
            records_retrieved: extracted.records.len(),
            ..RunReport::default()
        };
        tracing::info!(
            "Extracted {} MMS ID(s), {} holding reference(s), {} record(s)",
            report.identifiers,
            report.holding_references,
            report.records_retrieved
        );

        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_phase("transform");
        report.records_normalized = transformed.normalized.len();
        tracing::info!(
            "Normalized {} record(s), {} without a 583 field",
            report.records_normalized,
            transformed.skipped
        );

        let loaded = self.pipeline.load(transformed).await?;
        self.monitor.log_phase("load");
        report.records_written = loaded.records_written;
        report.output_path = loaded.output_path;
        tracing::info!("Wrote {} record(s) to {}", report.records_written, report.output_path);
        if loaded.records_rejected > 0 {
            tracing::warn!("{} record(s) rejected without a 583 field", loaded.records_rejected);
        }

        self.monitor.log_final();
        Ok(report)
    }
}
