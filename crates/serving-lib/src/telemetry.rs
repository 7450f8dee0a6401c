//! Append-only telemetry log for served predictions and feedback
//!
//! Every successful feedback submission appends exactly two records, one per
//! model version. The JSONL logger writes the pair in a single buffered
//! write under a lock so concurrent sessions can never interleave or split
//! a pair. Nothing in this crate reads the log back.

use crate::models::TelemetryRecord;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Destination for telemetry records. Appends must be atomic per record;
/// `append_pair` additionally keeps the two records of one submission
/// together.
pub trait TelemetrySink: Send + Sync {
    fn append(&self, record: &TelemetryRecord) -> Result<()>;

    fn append_pair(&self, records: &[TelemetryRecord; 2]) -> Result<()> {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }
}

/// Durable sink writing one JSON object per line.
pub struct JsonlTelemetryLogger {
    file: Mutex<File>,
    path: PathBuf,
}

impl JsonlTelemetryLogger {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open telemetry log {:?}", path))?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_lines(&self, buf: &[u8]) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| anyhow::anyhow!("Telemetry log lock poisoned: {}", e))?;
        file.write_all(buf).context("Failed to append telemetry record")?;
        file.flush().context("Failed to flush telemetry log")?;
        Ok(())
    }

    fn encode(record: &TelemetryRecord, buf: &mut Vec<u8>) -> Result<()> {
        serde_json::to_writer(&mut *buf, record).context("Failed to serialize telemetry record")?;
        buf.push(b'\n');
        Ok(())
    }
}

impl TelemetrySink for JsonlTelemetryLogger {
    fn append(&self, record: &TelemetryRecord) -> Result<()> {
        let mut buf = Vec::new();
        Self::encode(record, &mut buf)?;
        self.write_lines(&buf)?;
        debug!(path = %self.path.display(), model_version = %record.model_version, "Telemetry record appended");
        Ok(())
    }

    fn append_pair(&self, records: &[TelemetryRecord; 2]) -> Result<()> {
        // Both lines serialized before any byte hits the file, then written
        // in one call: a serialization failure writes nothing, and the pair
        // lands contiguously.
        let mut buf = Vec::new();
        for record in records {
            Self::encode(record, &mut buf)?;
        }
        self.write_lines(&buf)?;
        debug!(path = %self.path.display(), records = 2, "Telemetry pair appended");
        Ok(())
    }
}

/// In-memory sink for tests and embedders that handle persistence
/// themselves.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().expect("memory sink lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("memory sink lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn append(&self, record: &TelemetryRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory sink lock poisoned: {}", e))?
            .push(record.clone());
        Ok(())
    }
}
