use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::segment::CAPTURE_SAMPLE_RATE;

/// Samples per captured block (matches a 4096-frame capture buffer)
pub const CAPTURE_BLOCK_SIZE: usize = 4096;

/// One block of captured mono audio
#[derive(Debug, Clone)]
pub struct AudioBlock {
    /// Normalized samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Microphone capture source
///
/// Implementations:
/// - WAV file replayed in real time (stand-in for a device)
/// - Unavailable (no device configured; acquisition always fails)
#[async_trait::async_trait]
pub trait MicrophoneSource: Send + Sync {
    /// Start capturing
    ///
    /// Returns a channel receiver that will receive audio blocks
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>>;

    /// Stop capturing and release the device. Safe to call repeatedly.
    fn stop(&mut self);

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Microphone input selection
#[derive(Debug, Clone)]
pub enum MicrophoneInput {
    /// Replay a WAV file as if it were live input
    File(String),
    /// No device
    None,
}

/// Microphone source factory
pub struct MicrophoneFactory;

impl MicrophoneFactory {
    pub fn create(input: MicrophoneInput) -> Box<dyn MicrophoneSource> {
        match input {
            MicrophoneInput::File(path) => Box::new(WavFileMicrophone::new(path)),
            MicrophoneInput::None => Box::new(UnavailableMicrophone),
        }
    }
}

/// Replays a WAV file at 16 kHz mono in real-time-paced blocks, looping
pub struct WavFileMicrophone {
    path: PathBuf,
    block_size: usize,
    task: Option<JoinHandle<()>>,
}

impl WavFileMicrophone {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_size: CAPTURE_BLOCK_SIZE,
            task: None,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }
}

/// Load a WAV file as 16 kHz mono normalized samples
pub fn load_capture_samples(path: &Path) -> Result<Vec<f32>> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?,
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    if spec.sample_rate == CAPTURE_SAMPLE_RATE {
        return Ok(mono);
    }

    // Decimate: take every Nth sample
    let ratio = spec.sample_rate / CAPTURE_SAMPLE_RATE;
    if ratio < 1 || spec.sample_rate % CAPTURE_SAMPLE_RATE != 0 {
        anyhow::bail!(
            "Unsupported microphone sample rate {}Hz (need a multiple of {}Hz)",
            spec.sample_rate,
            CAPTURE_SAMPLE_RATE
        );
    }

    Ok(mono.into_iter().step_by(ratio as usize).collect())
}

#[async_trait::async_trait]
impl MicrophoneSource for WavFileMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>> {
        self.stop();

        let path = self.path.clone();
        let samples = tokio::task::spawn_blocking(move || load_capture_samples(&path))
            .await
            .context("Microphone loader panicked")??;

        if samples.is_empty() {
            anyhow::bail!("Microphone file {} has no audio", self.path.display());
        }

        info!(
            "Microphone started from {} ({} samples @ {}Hz)",
            self.path.display(),
            samples.len(),
            CAPTURE_SAMPLE_RATE
        );

        let (tx, rx) = mpsc::channel(16);
        let block_size = self.block_size;
        let block_period =
            Duration::from_secs_f64(block_size as f64 / CAPTURE_SAMPLE_RATE as f64);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_period);
            let mut elapsed_ms = 0u64;

            for block in samples.chunks(block_size).cycle() {
                ticker.tick().await;

                let frame = AudioBlock {
                    samples: block.to_vec(),
                    sample_rate: CAPTURE_SAMPLE_RATE,
                    timestamp_ms: elapsed_ms,
                };
                elapsed_ms += block_period.as_millis() as u64;

                if tx.send(frame).await.is_err() {
                    debug!("Microphone receiver dropped");
                    break;
                }
            }
        }));

        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Microphone stopped ({})", self.path.display());
        }
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

impl Drop for WavFileMicrophone {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Source used when no microphone is configured
pub struct UnavailableMicrophone;

#[async_trait::async_trait]
impl MicrophoneSource for UnavailableMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>> {
        anyhow::bail!("No microphone configured")
    }

    fn stop(&mut self) {}

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
