//! Where frames come from.
//!
//! The sensor (or a recording of it) is opened once at startup and must be released
//! when the processing loop ends, whatever the reason. [`SensorSession`] ties the
//! release to scope exit.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::{Error, Result};


/// Status reported for frames which couldn't be parsed
pub const STATUS_MALFORMED: i32 = -1;


/// Raw samples of one acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionFrame {
    /// Non zero means the sensor failed to deliver this frame
    pub status: i32,
    pub i: Vec<i32>,
    pub q: Vec<i32>,
}

impl AcquisitionFrame {
    pub fn new(status: i32, i: Vec<i32>, q: Vec<i32>) -> Self {
        Self { status, i, q }
    }

    pub fn malformed() -> Self {
        Self::new(STATUS_MALFORMED, Vec::new(), Vec::new())
    }

    pub fn is_ok(&self) -> bool {
        self.status == 0
    }
}


pub trait FrameSource {
    /// Open and configure the sensor. Failure here is fatal.
    fn start(&mut self) -> Result<()>;

    /// Next frame, blocking until it is available. `Ok(None)` means end of stream.
    fn acquire(&mut self) -> Result<Option<AcquisitionFrame>>;

    /// Switch the sensor off. Called exactly once.
    fn release(&mut self);
}

/// Started source which is released when dropped
pub struct SensorSession<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> SensorSession<S> {
    pub fn open(mut source: S) -> Result<Self> {
        source.start()?;
        Ok(Self { source })
    }

    pub fn acquire(&mut self) -> Result<Option<AcquisitionFrame>> {
        self.source.acquire()
    }
}

impl<S: FrameSource> Drop for SensorSession<S> {
    fn drop(&mut self) {
        self.source.release();
        log::info!("Sensor released");
    }
}


/// Plays back frames recorded as CSV rows: `status, I[0..Ns], Q[0..Ns]`.
///
/// With `pace` set, frames are delivered no faster than the given interval,
/// which keeps the frame rate seen by the pipeline close to the recording.
pub struct ReplaySource<R: Read> {
    samples_per_frame: usize,
    pace: Option<Duration>,
    reader: Option<R>,
    records: Option<StringRecordsIntoIter<R>>,
    last_frame: Option<Instant>,
}

impl ReplaySource<File> {
    pub fn from_path(path: &Path, samples_per_frame: usize, pace: Option<Duration>) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Source(format!("can't open {}: {e}", path.display())))?;
        Ok(Self::new(file, samples_per_frame, pace))
    }
}

impl<R: Read> ReplaySource<R> {
    pub fn new(reader: R, samples_per_frame: usize, pace: Option<Duration>) -> Self {
        Self {
            samples_per_frame,
            pace,
            reader: Some(reader),
            records: None,
            last_frame: None,
        }
    }

    fn parse(&self, record: &StringRecord) -> AcquisitionFrame {
        let ns = self.samples_per_frame;
        if record.len() != 1 + 2 * ns {
            return AcquisitionFrame::malformed();
        }
        let values: std::result::Result<Vec<i32>, _> = record.iter().map(|f| f.parse::<i32>()).collect();
        match values {
            Ok(values) => AcquisitionFrame::new(
                values[0],
                values[1..=ns].to_vec(),
                values[ns + 1..].to_vec(),
            ),
            Err(_) => AcquisitionFrame::malformed(),
        }
    }

    fn wait_for_slot(&mut self) {
        if let (Some(pace), Some(last)) = (self.pace, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < pace {
                thread::sleep(pace - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

impl<R: Read> FrameSource for ReplaySource<R> {
    fn start(&mut self) -> Result<()> {
        let reader = self.reader.take()
            .ok_or_else(|| Error::Source("replay already started".into()))?;
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();
        self.records = Some(records);
        log::info!("Replay started, {} samples per frame", self.samples_per_frame);
        Ok(())
    }

    fn acquire(&mut self) -> Result<Option<AcquisitionFrame>> {
        let records = self.records.as_mut()
            .ok_or_else(|| Error::Source("replay not started".into()))?;
        let record = match records.next() {
            None => return Ok(None),
            Some(Ok(record)) => record,
            Some(Err(e)) if e.is_io_error() => return Err(e.into()),
            Some(Err(e)) => {
                log::warn!("Unreadable replay row: {e}");
                return Ok(Some(AcquisitionFrame::malformed()));
            }
        };
        let frame = self.parse(&record);
        self.wait_for_slot();
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.records = None;
    }
}
