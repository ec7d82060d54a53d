use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
use voice_paddle::analysis::{JitterFilter, PitchDetector};
use voice_paddle::calibration::{CalibrationUi, MemoryStore};
use voice_paddle::fixtures;
use voice_paddle::{
    AppConfig, CalibrationPersistence, CalibrationWizard, CaptureBackend, CpalBackend,
    JsonFileStore, SyntheticBackend, VoicePipeline, WizardEvent,
};

/// Target frame period of the live loops
const FRAME: Duration = Duration::from_millis(16);
/// Fixed frame step used by `simulate`
const SIMULATION_DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(
    name = "voice_paddle",
    about = "Voice-driven paddle control: calibration and live control signal"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Calibration store (overrides calibration.store_path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Log verbosity: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive calibration on the microphone (Enter = next, s = skip, b = back, q = quit)
    Calibrate,
    /// Print the live control signal
    Run {
        #[arg(long, default_value_t = 10.0)]
        seconds: f32,
    },
    /// Scripted calibration on a synthetic signal; prints the result as JSON
    Simulate,
    /// Print a pitch track for a WAV file as JSON lines
    Analyze { wav: PathBuf },
    /// Print the stored calibration
    Show,
    /// List capture devices
    Devices,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.calibration.store_path.clone());

    match cli.command {
        Commands::Calibrate => run_calibrate(&config, &store_path),
        Commands::Run { seconds } => run_live(&config, &store_path, seconds),
        Commands::Simulate => run_simulate(&config),
        Commands::Analyze { wav } => run_analyze(&config, &wav),
        Commands::Show => run_show(&store_path),
        Commands::Devices => run_devices(),
    }
}

fn open_live_pipeline(config: &AppConfig) -> Result<VoicePipeline<CpalBackend>> {
    let backend = CpalBackend::new(config.audio.device_name.clone());
    let mut pipeline = VoicePipeline::new(backend, config);
    pipeline
        .initialize()
        .context("opening capture device")?;
    Ok(pipeline)
}

/// Console rendering of the calibration UI callbacks
#[derive(Default)]
struct ConsoleUi {
    instruction: String,
    live_line: bool,
}

impl ConsoleUi {
    fn end_live_line(&mut self) {
        if self.live_line {
            println!();
            self.live_line = false;
        }
    }
}

impl CalibrationUi for ConsoleUi {
    fn set_instruction_text(&mut self, text: &str) {
        if text == self.instruction {
            return;
        }
        self.instruction = text.to_string();

        let line = text.trim_end().replace("\n\n", " | ").replace('\n', " ");
        if text.starts_with("Recording:") {
            print!("\r{:<60}", line);
            io::stdout().flush().ok();
            self.live_line = true;
        } else {
            self.end_live_line();
            println!("{}", line);
        }
    }

    fn set_button_text(&mut self, text: &str) {
        self.end_live_line();
        println!("  [Enter] {}", text);
    }

    fn set_button_enabled(&mut self, _enabled: bool) {}

    fn show_meter(&mut self, _visible: bool) {}

    fn update_meter(&mut self, _value: f32) {}

    fn set_skip_visible(&mut self, visible: bool) {
        if visible {
            println!("  [s] Skip");
        }
    }

    fn set_back_visible(&mut self, visible: bool) {
        if visible {
            println!("  [b] Back");
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line.trim().to_lowercase()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drain wizard events; applies completed calibrations to the live mapper
fn pump_events<B: CaptureBackend>(
    events: &mut tokio::sync::broadcast::Receiver<WizardEvent>,
    pipeline: &mut VoicePipeline<B>,
) {
    loop {
        match events.try_recv() {
            Ok(WizardEvent::CalibrationComplete(data)) => {
                pipeline.mapper_mut().apply_calibration(&data);
            }
            Ok(WizardEvent::RecordingFinished { step, result }) => {
                tracing::debug!(?step, ?result, "recording finished");
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "wizard events dropped");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn run_calibrate(config: &AppConfig, store_path: &Path) -> Result<ExitCode> {
    let mut pipeline = open_live_pipeline(config)?;
    pipeline.load_calibration(&JsonFileStore::new(store_path));

    let mut wizard = CalibrationWizard::new(
        JsonFileStore::new(store_path),
        ConsoleUi::default(),
        pipeline.feature_tap(),
        config.calibration.clone(),
    );
    let mut events = wizard.subscribe();
    let input = spawn_stdin_reader();

    wizard.start();
    let mut last = Instant::now();

    while !wizard.is_finished() {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        pipeline.update(dt);
        wizard.update(dt);

        while let Ok(command) = input.try_recv() {
            let result = match command.as_str() {
                "" | "n" => wizard.next_clicked(),
                "s" => wizard.skip_clicked(),
                "b" => wizard.back_clicked(),
                "q" => {
                    println!("Calibration aborted");
                    return Ok(ExitCode::from(0));
                }
                other => {
                    println!("Unknown command '{}'", other);
                    Ok(())
                }
            };
            if let Err(err) = result {
                println!("  ! {}", err);
            }
        }

        pump_events(&mut events, &mut pipeline);
        thread::sleep(FRAME);
    }

    println!("{}", serde_json::to_string_pretty(wizard.data())?);
    pipeline.shutdown();
    Ok(ExitCode::from(0))
}

fn run_live(config: &AppConfig, store_path: &Path, seconds: f32) -> Result<ExitCode> {
    let mut pipeline = open_live_pipeline(config)?;
    pipeline.load_calibration(&JsonFileStore::new(store_path));
    // pitch is printed alongside the signal
    pipeline.observe_pitch(true);

    let started = Instant::now();
    let mut last = started;
    let mut last_print = started;

    while started.elapsed().as_secs_f32() < seconds {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let signal = pipeline.update(dt);

        if now.duration_since(last_print) >= Duration::from_millis(100) {
            last_print = now;
            let features = pipeline.features();
            let line = json!({
                "t": started.elapsed().as_secs_f32(),
                "loudness": features.loudness,
                "pitch": features.pitch,
                "signal": signal,
            });
            println!("{}", line);
        }
        thread::sleep(FRAME);
    }

    tracing::info!(
        restarts = pipeline.input().restart_count(),
        "live run finished"
    );
    pipeline.shutdown();
    Ok(ExitCode::from(0))
}

fn run_simulate(config: &AppConfig) -> Result<ExitCode> {
    let rate = fixtures::SIMULATION_SAMPLE_RATE;
    let frame_samples = (rate as f32 * SIMULATION_DT).round() as usize;

    let mut backend = SyntheticBackend::new(rate);
    backend.push(&fixtures::constant(0.001, frame_samples));
    let mut pipeline = VoicePipeline::new(backend, config);
    pipeline
        .initialize()
        .context("starting synthetic capture")?;

    let mut wizard = CalibrationWizard::new(
        MemoryStore::new(),
        voice_paddle::calibration::NullUi,
        pipeline.feature_tap(),
        config.calibration.clone(),
    );
    let mut events = wizard.subscribe();
    wizard.start();
    wizard.next_clicked()?;

    for level in [0.001_f32, 0.05, 0.3] {
        wizard.next_clicked()?;
        while wizard.recorder().is_recording() {
            pipeline
                .input_mut()
                .backend_mut()
                .push(&fixtures::constant(level, frame_samples));
            pipeline.update(SIMULATION_DT);
            wizard.update(SIMULATION_DT);
        }
        pump_events(&mut events, &mut pipeline);
        wizard.next_clicked()?;
    }
    pump_events(&mut events, &mut pipeline);

    let saved = wizard
        .persistence()
        .load()?
        .ok_or_else(|| anyhow!("simulation did not persist a calibration"))?;
    println!("{}", serde_json::to_string_pretty(&saved)?);
    Ok(ExitCode::from(0))
}

fn run_analyze(config: &AppConfig, wav: &Path) -> Result<ExitCode> {
    let (samples, rate) = fixtures::read_wav(wav)
        .with_context(|| format!("reading {}", wav.display()))?;

    let window = config.audio.pitch_window.max(1);
    let hop = (window / 4).max(1);
    let loudness_window = config.audio.loudness_window.clamp(1, window);

    let mut detector = PitchDetector::new(&config.pitch);
    let mut jitter = JitterFilter::new(&config.jitter);

    let mut start = 0;
    while start + window <= samples.len() {
        let frame = &samples[start..start + window];
        let tail = &frame[window - loudness_window..];
        let loudness = tail.iter().map(|s| s.abs()).sum::<f32>() / tail.len() as f32;

        let raw_pitch = if loudness > config.pitch.loudness_gate {
            detector.detect_pitch(frame, rate)
        } else {
            0.0
        };
        jitter.add_sample(raw_pitch);

        let line = json!({
            "t": (start + window) as f32 / rate as f32,
            "loudness": loudness,
            "raw_pitch": raw_pitch,
            "confidence": detector.last_confidence(),
            "pitch": jitter.filtered_pitch(),
        });
        println!("{}", line);
        start += hop;
    }

    Ok(ExitCode::from(0))
}

fn run_show(store_path: &Path) -> Result<ExitCode> {
    let store = JsonFileStore::new(store_path);
    match store.load()? {
        Some(data) => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            if !data.is_valid() {
                println!("(stored calibration is invalid; defaults will be used)");
            }
        }
        None => println!("No calibration stored at {}", store_path.display()),
    }
    Ok(ExitCode::from(0))
}

fn run_devices() -> Result<ExitCode> {
    let devices = CpalBackend::list_devices();
    if devices.is_empty() {
        println!("No input devices found");
    }
    for name in devices {
        println!("{}", name);
    }
    Ok(ExitCode::from(0))
}
