use crate::difficulty::SoundPosition;
use crate::error::AnalyticsError;
use crate::reference::Phoneme;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One record per finished or abandoned session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Sound of the last round played
    pub target_sound: Phoneme,
    pub sound_position: SoundPosition,
    pub environment: String,
    pub difficulty: String,
    pub creatures_shown: u32,
    pub correct_selections: u32,
    pub incorrect_selections: u32,
    pub success_rate_percent: f64,
    pub time_spent_seconds: u32,
    pub completed: bool,
}

/// Analytics collaborator. Delivery is best effort; the engine logs
/// failures and carries on.
pub trait AnalyticsSink {
    fn record(&mut self, summary: &SessionSummary) -> Result<(), AnalyticsError>;
}

/// Drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn record(&mut self, _summary: &SessionSummary) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// Keeps records in memory. Clones share the same storage, so a handle can be
/// kept after the sink is handed to an engine.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<SessionSummary>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionSummary> {
        self.records.borrow().clone()
    }
}

impl AnalyticsSink for MemorySink {
    fn record(&mut self, summary: &SessionSummary) -> Result<(), AnalyticsError> {
        self.records.borrow_mut().push(summary.clone());
        Ok(())
    }
}

/// Appends one CSV row per session, writing a header when the file is new
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    path: PathBuf,
}

impl CsvLogSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<SessionSummary>, AnalyticsError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

impl AnalyticsSink for CsvLogSink {
    fn record(&mut self, summary: &SessionSummary) -> Result<(), AnalyticsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(summary)?;
        writer.flush()?;
        Ok(())
    }
}
