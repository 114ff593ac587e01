use std::time::Duration;

use ptylog_core::report::{Report, ReportSink};
use ptylog_core::DeliveryError;
use serde::Serialize;

use super::{http_agent, map_http_error};

/// Posts lines as JSON to a collector endpoint
pub struct HttpSink {
    agent: ureq::Agent,
    url: String,
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    lines: &'a [String],
    identifier: &'a str,
}

impl HttpSink {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            agent: http_agent(timeout),
            url: url.to_string(),
        }
    }
}

impl ReportSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn report(&self, report: &Report) -> Result<(), DeliveryError> {
        self.agent
            .post(&self.url)
            .send_json(report)
            .map(|_| ())
            .map_err(map_http_error)
    }

    fn report_batch(&self, lines: &[String], identifier: &str) -> Result<(), DeliveryError> {
        self.agent
            .post(&self.url)
            .send_json(BatchPayload { lines, identifier })
            .map(|_| ())
            .map_err(map_http_error)
    }
}
