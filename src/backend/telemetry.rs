//! Delivery of results.
//!
//! The processing loop hands records over through a bounded channel and never waits
//! for the sink. A single delivery thread drains the channel. When the channel is
//! full, or the sink fails, the record is logged and dropped.

use std::io::Write;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Sender, TrySendError};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub vertical_height_m: f64,
    pub slant_distance_m: f64,
    pub exact_range_index: f64,
    pub velocity_m_s: f64,
    pub doppler_freq_hz: f64,
    pub sample_rate_hz: f64,
    pub max_velocity_m_s: f64,
    pub moving: bool,
    pub stable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// Raw arrays for offline plots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub range_fft: Vec<f64>,
    pub mag_history: Vec<f64>,
    pub phase_history: Vec<f64>,
    pub doppler_spec: Vec<f64>,
}

/// Flat row for CSV output, the diagnostic arrays don't fit into columns
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: &'a DateTime<Utc>,
    session_id: &'a Uuid,
    vertical_height_m: f64,
    slant_distance_m: f64,
    exact_range_index: f64,
    velocity_m_s: f64,
    doppler_freq_hz: f64,
    sample_rate_hz: f64,
    max_velocity_m_s: f64,
    moving: bool,
    stable: bool,
}

impl<'a> From<&'a TelemetryRecord> for CsvRow<'a> {
    fn from(r: &'a TelemetryRecord) -> Self {
        Self {
            timestamp: &r.timestamp,
            session_id: &r.session_id,
            vertical_height_m: r.vertical_height_m,
            slant_distance_m: r.slant_distance_m,
            exact_range_index: r.exact_range_index,
            velocity_m_s: r.velocity_m_s,
            doppler_freq_hz: r.doppler_freq_hz,
            sample_rate_hz: r.sample_rate_hz,
            max_velocity_m_s: r.max_velocity_m_s,
            moving: r.moving,
            stable: r.stable,
        }
    }
}


pub trait TelemetrySink: Send {
    fn deliver(&mut self, record: &TelemetryRecord) -> Result<()>;
}

/// One JSON document per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn deliver(&mut self, record: &TelemetryRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub struct CsvSink<W: Write + Send> {
    writer: csv::Writer<W>,
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: csv::Writer::from_writer(writer) }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| Error::Telemetry(e.to_string()))
    }
}

impl<W: Write + Send> TelemetrySink for CsvSink<W> {
    fn deliver(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.writer.serialize(CsvRow::from(record))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a short summary into the log
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn deliver(&mut self, r: &TelemetryRecord) -> Result<()> {
        log::info!(
            "Rate: {:.0} Hz | H: {:.3} m | V: {:.3} m/s | Freq: {:.2} Hz",
            r.sample_rate_hz, r.vertical_height_m, r.velocity_m_s, r.doppler_freq_hz
        );
        Ok(())
    }
}


/// Non-blocking hand-off from the processing loop to a delivery thread
pub struct TelemetryDispatcher {
    sender: Option<Sender<TelemetryRecord>>,
    worker: Option<JoinHandle<()>>,
    dropped: u64,
}

impl TelemetryDispatcher {
    pub fn spawn(mut sink: Box<dyn TelemetrySink>, capacity: usize) -> Result<Self> {
        let (tx, rx) = channel::bounded::<TelemetryRecord>(capacity);
        let worker = thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || {
                for record in rx.iter() {
                    if let Err(e) = sink.deliver(&record) {
                        log::warn!("Telemetry delivery failed, record dropped: {e}");
                    }
                }
            })?;

        Ok(Self {
            sender: Some(tx),
            worker: Some(worker),
            dropped: 0,
        })
    }

    /// Queue a record. Never blocks; returns false if the record was dropped.
    pub fn dispatch(&mut self, record: TelemetryRecord) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::warn!("Telemetry queue full, record dropped ({} so far)", self.dropped);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                log::warn!("Telemetry worker is gone, record dropped");
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Deliver what is still queued and stop the worker
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Telemetry worker panicked");
            }
        }
    }
}

impl Drop for TelemetryDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
