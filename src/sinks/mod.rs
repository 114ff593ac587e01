//! Report sink implementations
//!
//! Each sink turns finalized lines into one kind of remote (or local) record.
//! They are selected from [`Settings`] and only ever run on delivery workers.

mod http;
mod supabase;
mod tracing_sink;

pub use http::HttpSink;
pub use supabase::SupabaseSink;
pub use tracing_sink::TracingSink;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use ptylog_core::report::ReportSink;
use ptylog_core::DeliveryError;

use crate::config::{Settings, SinkKind};

/// Build the sink selected by `settings`
pub fn build_sink(settings: &Settings) -> Result<Arc<dyn ReportSink>> {
    let timeout = Duration::from_secs(settings.report.timeout_secs);

    let sink: Arc<dyn ReportSink> = match settings.sink_kind() {
        SinkKind::Log => Arc::new(TracingSink),
        SinkKind::Http => {
            let Some(url) = settings.report.url.as_deref() else {
                bail!("The http sink needs a collector URL (--url)");
            };
            Arc::new(HttpSink::new(url, timeout))
        }
        SinkKind::Supabase => {
            let (Some(url), Some(key)) = (
                settings.supabase.url.as_deref(),
                settings.supabase.key.as_deref(),
            ) else {
                bail!("The supabase sink needs SUPABASE_URL and SUPABASE_KEY");
            };
            Arc::new(SupabaseSink::new(url, key, &settings.supabase.table, timeout))
        }
    };
    Ok(sink)
}

/// Shared HTTP agent with a global per-request timeout
fn http_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build(),
    )
}

fn map_http_error(err: ureq::Error) -> DeliveryError {
    match err {
        ureq::Error::StatusCode(status) => DeliveryError::Status { status },
        other => DeliveryError::Transport(other.to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_log_sink_by_default() {
        let sink = build_sink(&Settings::default()).unwrap();
        assert_eq!(sink.name(), "log");
    }

    #[test]
    fn test_build_http_sink_from_url() {
        let mut settings = Settings::default();
        settings.report.url = Some("http://localhost:8000/log".to_string());
        assert_eq!(build_sink(&settings).unwrap().name(), "http");
    }

    #[test]
    fn test_http_sink_requires_url() {
        let mut settings = Settings::default();
        settings.report.sink = Some(SinkKind::Http);
        assert!(build_sink(&settings).is_err());
    }

    #[test]
    fn test_supabase_sink_requires_credentials() {
        let mut settings = Settings::default();
        settings.report.sink = Some(SinkKind::Supabase);
        settings.supabase.url = Some("https://project.supabase.co".to_string());
        assert!(build_sink(&settings).is_err());

        settings.supabase.key = Some("anon-key".to_string());
        assert_eq!(build_sink(&settings).unwrap().name(), "supabase");
    }
}
