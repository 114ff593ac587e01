//! Helpers shared by the session integration tests

#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ptylog_core::pty::CommandSpec;
use ptylog_core::report::{Delivery, Dispatcher, DispatcherConfig, Report, ReportSink, Reporter};
use ptylog_core::{DeliveryError, Session, SessionConfig, SessionOutcome};

/// Gap comfortably above the paste threshold
pub const KEY_GAP: Duration = Duration::from_millis(25);

#[derive(Default)]
pub struct RecordingSink {
    pub lines: Mutex<Vec<Report>>,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl ReportSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn report(&self, report: &Report) -> Result<(), DeliveryError> {
        self.lines.lock().unwrap().push(report.clone());
        Ok(())
    }

    fn report_batch(&self, lines: &[String], _identifier: &str) -> Result<(), DeliveryError> {
        self.batches.lock().unwrap().push(lines.to_vec());
        Ok(())
    }
}

impl RecordingSink {
    pub fn line_texts(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.line.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct SharedOutput(pub Arc<Mutex<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

pub fn type_keys(input: &mut File, bytes: &[u8]) {
    for &b in bytes {
        thread::sleep(KEY_GAP);
        input.write_all(&[b]).unwrap();
    }
}

pub fn paste(input: &mut File, bytes: &[u8]) {
    thread::sleep(KEY_GAP);
    input.write_all(bytes).unwrap();
}

pub fn start(argv: &[&str], delivery: Delivery, sink: Arc<RecordingSink>) -> (Session, File) {
    let (read_fd, write_fd) = nix::unistd::pipe().unwrap();
    let dispatcher = Dispatcher::start(sink, DispatcherConfig::default()).unwrap();
    let reporter = Reporter::new(dispatcher, delivery, "tester".into(), "cat".into());
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    let config = SessionConfig::new(CommandSpec::from_argv(&argv).unwrap());
    let session = Session::start(config, reporter, File::from(read_fd)).unwrap();
    (session, File::from(write_fd))
}

/// Run a `cat` session, feeding input from `script` and closing it afterwards
pub fn run_cat<F>(delivery: Delivery, script: F) -> (SessionOutcome, Arc<RecordingSink>, SharedOutput)
where
    F: FnOnce(&mut File) + Send + 'static,
{
    let sink = Arc::new(RecordingSink::default());
    let (session, mut input) = start(&["--", "cat"], delivery, sink.clone());

    let writer = thread::spawn(move || {
        script(&mut input);
        // Dropping `input` closes the pipe and ends the session
    });

    let output = SharedOutput::default();
    let outcome = session.run(output.clone()).unwrap();
    writer.join().unwrap();
    (outcome, sink, output)
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
