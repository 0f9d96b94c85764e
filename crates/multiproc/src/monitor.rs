// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log fan-in for redirected worker streams.
//!
//! One tailer thread per tee'd file. A tailer waits for its file to appear
//! (the producer creates it), prefixes each line with `[{name}{rank}]:`,
//! and forwards it to the aggregate sink. Lines carrying the metrics tag
//! are parsed into a metrics map instead and handed to the publisher.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::metrics::MetricPublisher;

/// Marker that makes a worker log line a metrics record.
pub const METRICS_TAG: &str = "[LATTICE METRICS]";

const DEFAULT_TAIL_INTERVAL: Duration = Duration::from_millis(100);

/// Destination for aggregated log lines.
#[derive(Clone)]
pub enum LogSink {
    Stdout,
    Stderr,
    /// In-memory capture for tests.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl LogSink {
    fn write_line(&self, line: &str) {
        match self {
            LogSink::Stdout => {
                let _ = io::stdout().lock().write_all(line.as_bytes());
            }
            LogSink::Stderr => {
                let _ = io::stderr().lock().write_all(line.as_bytes());
            }
            LogSink::Buffer(buffer) => {
                buffer.lock().extend_from_slice(line.as_bytes());
            }
        }
    }
}

/// Tails a set of per-rank log files into one sink.
///
/// The files do not have to exist when `start` is called; each tailer
/// waits for its producer. Line ordering across files is not guaranteed.
pub struct LogMonitor {
    name: String,
    files: HashMap<usize, PathBuf>,
    sink: LogSink,
    interval: Duration,
    finished: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    metrics: Arc<Mutex<Vec<HashMap<String, String>>>>,
    publisher: Option<Arc<MetricPublisher>>,
    stopped: bool,
}

impl LogMonitor {
    pub fn new(
        name: impl Into<String>,
        files: HashMap<usize, PathBuf>,
        sink: LogSink,
        publisher: Option<Arc<MetricPublisher>>,
    ) -> Self {
        Self {
            name: name.into(),
            files,
            sink,
            interval: DEFAULT_TAIL_INTERVAL,
            finished: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
            metrics: Arc::new(Mutex::new(Vec::new())),
            publisher,
            stopped: false,
        }
    }

    pub fn log_file(&self, local_rank: usize) -> Option<&PathBuf> {
        self.files.get(&local_rank)
    }

    /// Take and clear the metrics captured so far.
    pub fn drain_metrics(&self) -> Vec<HashMap<String, String>> {
        std::mem::take(&mut *self.metrics.lock())
    }

    /// Spawn one tailer thread per file.
    pub fn start(&mut self) {
        for (local_rank, file) in &self.files {
            let header = format!("[{}{}]:", self.name, local_rank);
            let tailer = Tailer {
                header,
                file: file.clone(),
                sink: self.sink.clone(),
                finished: Arc::clone(&self.finished),
                interval: self.interval,
                metrics: Arc::clone(&self.metrics),
                publisher: self.publisher.clone(),
            };
            self.handles.push(std::thread::spawn(move || tailer.run()));
        }
    }

    /// Signal tailers to finish draining and join them.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.finished.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!(name = %self.name, "log tailer thread panicked");
            }
        }
        self.stopped = true;
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }
}

struct Tailer {
    header: String,
    file: PathBuf,
    sink: LogSink,
    finished: Arc<AtomicBool>,
    interval: Duration,
    metrics: Arc<Mutex<Vec<HashMap<String, String>>>>,
    publisher: Option<Arc<MetricPublisher>>,
}

impl Tailer {
    fn run(self) {
        // The producer creates the file; wait for it.
        while !self.file.exists() {
            if self.finished.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(self.interval);
        }

        let file = match File::open(&self.file) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(file = %self.file.display(), error = %e, "tailer open failed");
                return;
            }
        };
        let mut reader = BufReader::new(file);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    if self.finished.load(Ordering::SeqCst) {
                        return;
                    }
                    std::thread::sleep(self.interval);
                }
                Ok(_) => {
                    if let Some(idx) = line.find(METRICS_TAG) {
                        let metrics = parse_metrics(&line[idx + METRICS_TAG.len()..]);
                        tracing::info!(metrics = ?metrics, "worker metrics record");
                        if let Some(publisher) = &self.publisher {
                            publisher.push(&metrics);
                        }
                        self.metrics.lock().push(metrics);
                        continue;
                    }
                    self.sink.write_line(&format!("{}{}", self.header, line));
                }
                Err(e) => {
                    tracing::error!(file = %self.file.display(), error = %e, "tailer read failed");
                    return;
                }
            }
        }
    }
}

/// Parse `name1:val1,name2:val2,...`; malformed segments are dropped.
fn parse_metrics(raw: &str) -> HashMap<String, String> {
    let mut metrics = HashMap::new();
    for part in raw.trim().split(',') {
        if let Some((name, value)) = part.trim().split_once(':') {
            metrics.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    metrics
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
