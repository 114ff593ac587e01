use ptylog_core::report::{Report, ReportSink};
use ptylog_core::DeliveryError;

/// Writes lines to the log instead of a collector
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn name(&self) -> &str {
        "log"
    }

    fn report(&self, report: &Report) -> Result<(), DeliveryError> {
        tracing::info!(
            identifier = %report.identifier,
            program = %report.program,
            timestamp = %report.timestamp.to_rfc3339(),
            "line: {:?}",
            report.line
        );
        Ok(())
    }

    fn report_batch(&self, lines: &[String], identifier: &str) -> Result<(), DeliveryError> {
        tracing::info!(identifier = %identifier, "batch of {} line(s): {:?}", lines.len(), lines);
        Ok(())
    }
}
