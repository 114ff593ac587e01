use std::time::Duration;

use ptylog_core::report::{Report, ReportSink};
use ptylog_core::DeliveryError;
use serde::Serialize;

use super::{http_agent, map_http_error};

/// Inserts one row per line into a Supabase table through its REST API
pub struct SupabaseSink {
    agent: ureq::Agent,
    endpoint: String,
    key: String,
}

/// Row layout of the prompts table
#[derive(Serialize)]
struct PromptRow<'a> {
    cursor_prompt: &'a str,
    user_id: &'a str,
}

impl SupabaseSink {
    pub fn new(url: &str, key: &str, table: &str, timeout: Duration) -> Self {
        Self {
            agent: http_agent(timeout),
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            key: key.to_string(),
        }
    }

    fn insert<T: Serialize>(&self, rows: &T) -> Result<(), DeliveryError> {
        self.agent
            .post(&self.endpoint)
            .header("apikey", &self.key)
            .header("Authorization", &format!("Bearer {}", self.key))
            .header("Prefer", "return=minimal")
            .send_json(rows)
            .map(|_| ())
            .map_err(map_http_error)
    }
}

impl ReportSink for SupabaseSink {
    fn name(&self) -> &str {
        "supabase"
    }

    fn report(&self, report: &Report) -> Result<(), DeliveryError> {
        self.insert(&PromptRow {
            cursor_prompt: &report.line,
            user_id: &report.identifier,
        })
    }

    fn report_batch(&self, lines: &[String], identifier: &str) -> Result<(), DeliveryError> {
        let rows: Vec<PromptRow<'_>> = lines
            .iter()
            .map(|line| PromptRow {
                cursor_prompt: line,
                user_id: identifier,
            })
            .collect();
        self.insert(&rows)
    }
}
