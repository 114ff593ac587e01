use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use ptylog_core::input::CarriageReturns;
use ptylog_core::pty::CommandSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Wrap an interactive program and report the lines you submit to it"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Collector endpoint that receives each line as JSON
    #[arg(long)]
    pub url: Option<String>,

    /// Where finalized lines are delivered
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// Collect lines and deliver them in batches
    #[arg(long)]
    pub batch: bool,

    /// Lines per batch (implies --batch)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// With batching, also deliver every line as soon as it is submitted
    #[arg(long)]
    pub each_line: bool,

    /// Identifier attached to every reported line
    #[arg(long)]
    pub identifier: Option<String>,

    /// Inter-byte gap in milliseconds below which input counts as pasted
    #[arg(long)]
    pub paste_threshold_ms: Option<u64>,

    /// Carriage returns in reported lines: strip, keep or normalize
    #[arg(long, value_parser = parse_carriage_returns)]
    pub carriage_returns: Option<CarriageReturns>,

    /// Log file (default: <state dir>/ptylog.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Program to run, with its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

fn parse_carriage_returns(value: &str) -> Result<CarriageReturns, String> {
    match value {
        "strip" => Ok(CarriageReturns::Strip),
        "keep" => Ok(CarriageReturns::Keep),
        "normalize" => Ok(CarriageReturns::Normalize),
        other => Err(format!(
            "invalid value '{}' (expected strip, keep or normalize)",
            other
        )),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the program to wrap
    ///
    /// Exits with a usage error (code 2) when no program was given.
    pub fn wrap_command(&self) -> CommandSpec {
        match CommandSpec::from_argv(&self.command) {
            Some(spec) => spec,
            None => Self::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "no command supplied. Use -- /path/to/program args...",
                )
                .exit(),
        }
    }
}

/// Report sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Write lines to the log file only
    Log,
    /// POST JSON to a collector URL
    Http,
    /// Insert rows through the Supabase REST API
    Supabase,
}

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Input classification settings
    #[serde(default)]
    pub input: InputSettings,

    /// Report delivery settings
    #[serde(default)]
    pub report: ReportSettings,

    /// Supabase collector settings
    #[serde(default)]
    pub supabase: SupabaseSettings,

    /// PTY settings
    #[serde(default)]
    pub pty: PtySettings,

    /// Log file path
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Input classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    /// Inter-byte gap below which input is a paste burst (milliseconds)
    #[serde(default = "default_paste_threshold")]
    pub paste_threshold_ms: u64,

    /// Carriage-return handling for reported lines
    #[serde(default)]
    pub carriage_returns: CarriageReturns,
}

fn default_paste_threshold() -> u64 {
    5
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            paste_threshold_ms: default_paste_threshold(),
            carriage_returns: CarriageReturns::default(),
        }
    }
}

/// Report delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Sink to use (default: inferred from url / supabase credentials)
    #[serde(default)]
    pub sink: Option<SinkKind>,

    /// Collector URL for the http sink
    #[serde(default)]
    pub url: Option<String>,

    /// Identifier attached to reports (default: $USER)
    #[serde(default)]
    pub identifier: Option<String>,

    /// Deliver lines in batches instead of one by one
    #[serde(default)]
    pub batch: bool,

    /// Lines per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// When batching, still deliver each line on its own as well
    #[serde(default)]
    pub each_line: bool,

    /// Delivery worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Deliveries that may wait before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Timeout for each delivery in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    10
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_timeout() -> u64 {
    5
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            sink: None,
            url: None,
            identifier: None,
            batch: false,
            batch_size: default_batch_size(),
            each_line: false,
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Supabase collector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseSettings {
    /// Project URL (falls back to SUPABASE_URL)
    #[serde(default)]
    pub url: Option<String>,

    /// API key (falls back to SUPABASE_KEY)
    #[serde(default)]
    pub key: Option<String>,

    /// Table receiving one row per line
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "cursor_prompts".to_string()
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: default_table(),
        }
    }
}

impl SupabaseSettings {
    /// Whether both URL and key are known
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.key.is_some()
    }
}

/// PTY settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtySettings {
    /// Rows when the input is not a terminal
    #[serde(default = "default_rows")]
    pub rows: u16,

    /// Columns when the input is not a terminal
    #[serde(default = "default_cols")]
    pub cols: u16,

    /// How long to wait for the child after its terminal closes (milliseconds)
    #[serde(default = "default_child_grace")]
    pub child_grace_ms: u64,
}

fn default_rows() -> u16 {
    24
}

fn default_cols() -> u16 {
    80
}

fn default_child_grace() -> u64 {
    2000
}

impl Default for PtySettings {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            child_grace_ms: default_child_grace(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("ptylog/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/ptylog/config.toml")),
            dirs::home_dir().map(|p| p.join(".ptylog.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.report.url = Some(url.clone());
        }
        if let Some(sink) = cli.sink {
            self.report.sink = Some(sink);
        }
        if cli.batch {
            self.report.batch = true;
        }
        if let Some(batch_size) = cli.batch_size {
            self.report.batch = true;
            self.report.batch_size = batch_size;
        }
        if cli.each_line {
            self.report.each_line = true;
        }
        if let Some(identifier) = &cli.identifier {
            self.report.identifier = Some(identifier.clone());
        }
        if let Some(threshold) = cli.paste_threshold_ms {
            self.input.paste_threshold_ms = threshold;
        }
        if let Some(carriage_returns) = cli.carriage_returns {
            self.input.carriage_returns = carriage_returns;
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = Some(log_file.clone());
        }
    }

    /// Fill Supabase credentials from SUPABASE_URL / SUPABASE_KEY when unset
    pub fn apply_env(&mut self) {
        if self.supabase.url.is_none() {
            self.supabase.url = std::env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty());
        }
        if self.supabase.key.is_none() {
            self.supabase.key = std::env::var("SUPABASE_KEY").ok().filter(|v| !v.is_empty());
        }
    }

    /// Validate and normalize settings values
    ///
    /// Sizes and counts must be at least 1.
    pub fn validate(&mut self) {
        self.report.batch_size = self.report.batch_size.max(1);
        self.report.workers = self.report.workers.max(1);
        self.report.queue_capacity = self.report.queue_capacity.max(1);
        self.report.timeout_secs = self.report.timeout_secs.max(1);
        self.pty.rows = self.pty.rows.max(1);
        self.pty.cols = self.pty.cols.max(1);
    }

    /// Sink to build: explicit choice, else http with a URL, else supabase
    /// with credentials, else the log sink
    pub fn sink_kind(&self) -> SinkKind {
        if let Some(kind) = self.report.sink {
            return kind;
        }
        if self.report.url.is_some() {
            SinkKind::Http
        } else if self.supabase.is_configured() {
            SinkKind::Supabase
        } else {
            SinkKind::Log
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ptylog").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.input.paste_threshold_ms, 5);
        assert_eq!(settings.input.carriage_returns, CarriageReturns::Strip);
        assert!(!settings.report.batch);
        assert_eq!(settings.report.batch_size, 10);
        assert_eq!(settings.report.timeout_secs, 5);
        assert_eq!(settings.supabase.table, "cursor_prompts");
        assert_eq!(settings.sink_kind(), SinkKind::Log);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [input]
            paste_threshold_ms = 8
            carriage_returns = "normalize"

            [report]
            url = "http://localhost:8000/log"
            batch = true
            batch_size = 3

            [pty]
            child_grace_ms = 500
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.input.paste_threshold_ms, 8);
        assert_eq!(settings.input.carriage_returns, CarriageReturns::Normalize);
        assert!(settings.report.batch);
        assert_eq!(settings.report.batch_size, 3);
        assert_eq!(settings.report.workers, 2);
        assert_eq!(settings.pty.child_grace_ms, 500);
        assert_eq!(settings.sink_kind(), SinkKind::Http);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\nidentifier = \"alice\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.report.identifier.as_deref(), Some("alice"));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_cli_command_after_separator() {
        let cli = cli(&["--url", "http://collector/log", "--", "claude", "--debug"]);
        assert_eq!(cli.url.as_deref(), Some("http://collector/log"));
        assert!(!cli.debug);
        let spec = cli.wrap_command();
        assert_eq!(spec.program, "claude");
        assert_eq!(spec.args, vec!["--debug"]);
    }

    #[test]
    fn test_cli_command_without_separator() {
        let cli = cli(&["python3", "-i"]);
        let spec = cli.wrap_command();
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["-i"]);
    }

    #[test]
    fn test_cli_requires_command() {
        let err = Cli::try_parse_from(["ptylog", "--url", "http://x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_merge_cli() {
        let mut settings = Settings::default();
        let cli = cli(&[
            "--batch-size",
            "4",
            "--each-line",
            "--identifier",
            "bob",
            "--carriage-returns",
            "keep",
            "--paste-threshold-ms",
            "12",
            "--",
            "bash",
        ]);
        settings.merge_cli(&cli);
        assert!(settings.report.batch);
        assert_eq!(settings.report.batch_size, 4);
        assert!(settings.report.each_line);
        assert_eq!(settings.report.identifier.as_deref(), Some("bob"));
        assert_eq!(settings.input.carriage_returns, CarriageReturns::Keep);
        assert_eq!(settings.input.paste_threshold_ms, 12);
    }

    #[test]
    fn test_invalid_carriage_returns() {
        let result = Cli::try_parse_from(["ptylog", "--carriage-returns", "drop", "bash"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_clamps_zero() {
        let mut settings = Settings::default();
        settings.report.batch_size = 0;
        settings.report.workers = 0;
        settings.report.queue_capacity = 0;
        settings.validate();
        assert_eq!(settings.report.batch_size, 1);
        assert_eq!(settings.report.workers, 1);
        assert_eq!(settings.report.queue_capacity, 1);
    }

    #[test]
    fn test_supabase_from_env() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://project.supabase.co")),
                ("SUPABASE_KEY", Some("anon-key")),
            ],
            || {
                let mut settings = Settings::default();
                settings.apply_env();
                assert!(settings.supabase.is_configured());
                assert_eq!(settings.sink_kind(), SinkKind::Supabase);
            },
        );
    }

    #[test]
    fn test_config_file_wins_over_env() {
        temp_env::with_var("SUPABASE_URL", Some("https://env.supabase.co"), || {
            let mut settings = Settings::default();
            settings.supabase.url = Some("https://file.supabase.co".to_string());
            settings.apply_env();
            assert_eq!(
                settings.supabase.url.as_deref(),
                Some("https://file.supabase.co")
            );
        });
    }

    #[test]
    fn test_explicit_sink_wins() {
        let mut settings = Settings::default();
        settings.report.url = Some("http://collector".to_string());
        settings.report.sink = Some(SinkKind::Log);
        assert_eq!(settings.sink_kind(), SinkKind::Log);
    }
}
