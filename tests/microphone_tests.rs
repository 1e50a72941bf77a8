// Integration tests for the WAV-backed microphone

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use stagecast::audio::microphone::load_capture_samples;
use stagecast::audio::{
    MicrophoneFactory, MicrophoneInput, MicrophoneSource, WavFileMicrophone, CAPTURE_SAMPLE_RATE,
};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: i16) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames * channels as usize {
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_load_downmixes_and_decimates() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stereo48k.wav");
    write_wav(&path, 48000, 2, 4800, 16384)?;

    let samples = load_capture_samples(&path)?;

    // 0.1s at 48 kHz becomes 0.1s at 16 kHz
    assert_eq!(samples.len(), 1600);
    assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-4));

    Ok(())
}

#[test]
fn test_load_rejects_unsupported_rate() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("odd.wav");
    write_wav(&path, 22050, 1, 100, 0)?;

    assert!(load_capture_samples(&path).is_err());

    Ok(())
}

#[tokio::test]
async fn test_microphone_delivers_blocks_and_stops() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("mic.wav");
    write_wav(&path, CAPTURE_SAMPLE_RATE, 1, 1000, 8192)?;

    let mut microphone = WavFileMicrophone::new(&path).with_block_size(160);
    let mut blocks = microphone.start().await?;
    assert!(microphone.is_capturing());

    let first = tokio::time::timeout(Duration::from_secs(1), blocks.recv())
        .await?
        .expect("microphone closed early");
    assert_eq!(first.samples.len(), 160);
    assert_eq!(first.sample_rate, CAPTURE_SAMPLE_RATE);
    assert_eq!(first.timestamp_ms, 0);

    let second = tokio::time::timeout(Duration::from_secs(1), blocks.recv())
        .await?
        .expect("microphone closed early");
    assert_eq!(second.timestamp_ms, 10);

    microphone.stop();
    microphone.stop();
    assert!(!microphone.is_capturing());

    // Drain what was already queued; the channel then closes
    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        while blocks.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails_to_start() {
    let mut microphone = WavFileMicrophone::new("/nonexistent/mic.wav");
    assert!(microphone.start().await.is_err());
    assert!(!microphone.is_capturing());
}

#[tokio::test]
async fn test_unconfigured_microphone_is_unavailable() {
    let mut microphone = MicrophoneFactory::create(MicrophoneInput::None);
    assert_eq!(microphone.name(), "unavailable");
    assert!(microphone.start().await.is_err());
}
