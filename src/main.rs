use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use hydroradar::backend::source::{ReplaySource, SensorSession};
use hydroradar::backend::telemetry::{CsvSink, JsonLinesSink, LogSink, TelemetryDispatcher, TelemetrySink};
use hydroradar::diagnostics::measure_sampling;
use hydroradar::geometry::GeometryConstants;
use hydroradar::monitor::Monitor;
use hydroradar::Config;


#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure water level and velocity from recorded frames
    Run {
        /// CSV file with one frame per row: status, I samples, Q samples
        #[clap(short, long)]
        input: PathBuf,

        /// Deliver frames at this rate (Hz) instead of as fast as possible
        #[clap(long)]
        pace: Option<f64>,

        /// Where results go
        #[clap(long, value_enum, default_value_t = SinkKind::Log)]
        sink: SinkKind,

        /// Output file for the json and csv sinks
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Check how fast frames can be acquired and the velocity limit this gives
    Diagnose {
        #[clap(short, long)]
        input: PathBuf,

        /// Number of frames to time
        #[clap(short, long, default_value_t = 100)]
        frames: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SinkKind {
    Log,
    Json,
    Csv,
}

fn main() -> Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Can't load {}", args.config.display()))?;

    match args.command {
        Command::Run { input, pace, sink, output } => run(&config, input, pace, sink, output),
        Command::Diagnose { input, frames } => diagnose(&config, input, frames),
    }
}

fn run(config: &Config, input: PathBuf, pace: Option<f64>, sink: SinkKind, output: Option<PathBuf>) -> Result<()> {
    let pace = match pace {
        Some(hz) if hz > 0.0 => Some(Duration::from_secs_f64(1.0 / hz)),
        Some(hz) => anyhow::bail!("Pace must be positive, got {hz}"),
        None => None,
    };
    let sink = open_sink(sink, output)?;
    let mut dispatcher = TelemetryDispatcher::spawn(sink, config.telemetry.queue_capacity)?;

    let source = ReplaySource::from_path(&input, config.radar.samples_per_frame, pace)?;
    let session = SensorSession::open(source).context("Can't start the sensor")?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))
        .context("Can't install Ctrl-C handler")?;

    log::info!("Radar active. Telemetry interval: {}s", config.telemetry.interval_s);
    let mut monitor = Monitor::new(config);
    let stats = monitor.run(session, &mut dispatcher, &stop);
    dispatcher.shutdown();

    log::info!(
        "Stopped after {} frames ({} skipped), {} records emitted",
        stats.frames, stats.skipped, stats.emitted
    );
    Ok(())
}

fn open_sink(kind: SinkKind, output: Option<PathBuf>) -> Result<Box<dyn TelemetrySink>> {
    let open = |path: Option<PathBuf>| -> Result<BufWriter<File>> {
        let path = path.context("This sink needs --output")?;
        let file = File::create(&path).with_context(|| format!("Can't create {}", path.display()))?;
        Ok(BufWriter::new(file))
    };
    let sink: Box<dyn TelemetrySink> = match kind {
        SinkKind::Log => Box::new(LogSink),
        SinkKind::Json => Box::new(JsonLinesSink::new(open(output)?)),
        SinkKind::Csv => Box::new(CsvSink::new(open(output)?)),
    };
    Ok(sink)
}

fn diagnose(config: &Config, input: PathBuf, frames: usize) -> Result<()> {
    let geometry = GeometryConstants::from_config(config);
    let source = ReplaySource::from_path(&input, config.radar.samples_per_frame, None)?;
    let mut session = SensorSession::open(source).context("Can't start the sensor")?;

    println!("Timing {frames} acquisitions...");
    let Some(report) = measure_sampling(&mut session, frames, geometry.wavelength_m)? else {
        anyhow::bail!("No frames acquired");
    };

    println!("Frames:            {}", report.frames);
    println!("Total time:        {:.4} s", report.total.as_secs_f64());
    println!("Mean latency:      {:.2} ms", report.mean_latency.as_secs_f64() * 1000.0);
    println!("Sampling rate:     {:.2} Hz", report.sample_rate_hz);
    println!("Max flow velocity: {:.4} m/s", report.max_velocity_m_s);
    println!("{}", report.verdict);
    Ok(())
}
