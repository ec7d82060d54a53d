use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_voice_paddle"))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("voice_paddle_cli_{}_{}", name, std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn simulate_prints_monotonic_calibration() {
    let output = cli()
        .args(["--log-level", "error", "simulate"])
        .output()
        .expect("failed to run voice_paddle simulate");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("calibration JSON payload");
    let background = json["background"].as_f64().expect("background");
    let low = json["low"].as_f64().expect("low");
    let high = json["high"].as_f64().expect("high");

    assert!((background - 0.0015).abs() < 1e-5, "background {background}");
    assert!((low - 0.05).abs() < 1e-4, "low {low}");
    assert!((high - 0.3).abs() < 1e-4, "high {high}");
    assert!(json["speed"].as_f64().unwrap_or_default() > 0.0);
}

#[test]
fn show_reports_missing_store() {
    let dir = scratch_dir("show");
    let store = dir.join("missing.json");

    let output = cli()
        .args(["--log-level", "error", "--store", store.to_str().unwrap(), "show"])
        .output()
        .expect("failed to run voice_paddle show");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(
        stdout.contains("No calibration stored"),
        "unexpected output {stdout}"
    );
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn show_prints_stored_calibration() {
    let dir = scratch_dir("stored");
    let store = dir.join("calibration.json");
    std::fs::write(
        &store,
        r#"{"background":0.002,"low":0.03,"high":0.4,"speed":2.5}"#,
    )
    .unwrap();

    let output = cli()
        .args(["--log-level", "error", "--store", store.to_str().unwrap(), "show"])
        .output()
        .expect("failed to run voice_paddle show");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("stored calibration JSON");
    assert!((json["high"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    assert!((json["speed"].as_f64().unwrap() - 2.5).abs() < 1e-6);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analyze_tracks_wav_pitch() {
    let dir = scratch_dir("analyze");
    let wav = dir.join("tone.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
    for i in 0..22_050 {
        let t = i as f32 / 44_100.0;
        let sample = (2.0 * std::f32::consts::PI * 330.0 * t).sin() * 0.5;
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();

    let output = cli()
        .args(["--log-level", "error", "analyze", wav.to_str().unwrap()])
        .output()
        .expect("failed to run voice_paddle analyze");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let frames: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON line"))
        .collect();
    assert!(frames.len() > 10, "expected a pitch track, got {}", frames.len());

    let last = frames.last().unwrap();
    let pitch = last["pitch"].as_f64().unwrap();
    assert!((pitch - 330.0).abs() <= 1.5, "pitch {pitch}");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analyze_rejects_missing_file() {
    let output = cli()
        .args(["--log-level", "error", "analyze", "/nonexistent/voice.wav"])
        .output()
        .expect("failed to run voice_paddle analyze");
    assert_eq!(output.status.code(), Some(1));
}
