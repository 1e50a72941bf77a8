use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::pcm::encode_pcm16;
use super::segment::AudioSegment;

/// Audio output that accepts segments at absolute audio-clock times
pub trait AudioSink: Send {
    /// Queue `segment` to start at `start_time` seconds
    fn schedule(&mut self, segment: AudioSegment, start_time: f64) -> Result<()>;
}

/// Sink that only logs what it was given
#[derive(Debug, Default)]
pub struct DiscardSink;

impl AudioSink for DiscardSink {
    fn schedule(&mut self, segment: AudioSegment, start_time: f64) -> Result<()> {
        debug!(
            "Discarding {} samples scheduled at {:.3}s",
            segment.samples.len(),
            start_time
        );
        Ok(())
    }
}

/// Samples handed to hound per buffered write
const WRITE_BLOCK: usize = 16384;

type Writer = hound::WavWriter<BufWriter<File>>;

/// A segment waiting for the writer thread
struct TimelineWrite {
    segment: AudioSegment,
    start_time: f64,
}

/// Renders scheduled segments into a single WAV file.
///
/// The file starts at the first scheduled segment; later gaps are written as
/// silence, so it plays back exactly what the output device would have played.
/// All file I/O happens on a dedicated writer thread; `schedule` only queues.
pub struct WavTimelineSink {
    path: PathBuf,
    sample_rate: u32,
    queue: Option<mpsc::UnboundedSender<TimelineWrite>>,
    worker: Option<JoinHandle<Result<u64>>>,
}

impl WavTimelineSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create playback directory")?;
            }
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        let (queue, pending) = mpsc::unbounded_channel();
        let timeline = TimelineWriter {
            writer: Some(writer),
            sample_rate,
            origin: None,
            written: 0,
        };
        let worker = std::thread::Builder::new()
            .name("playback-writer".to_string())
            .spawn(move || timeline.run(pending))
            .context("Failed to spawn playback writer")?;

        info!("Rendering narration playback to {}", path.display());

        Ok(Self {
            path,
            sample_rate,
            queue: Some(queue),
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush queued segments, finalize the WAV header and return the number of
    /// samples written
    pub fn finish(mut self) -> Result<u64> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<u64> {
        // Closing the queue lets the writer drain and finalize
        self.queue.take();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| anyhow::anyhow!("Playback writer panicked"))?,
            None => Ok(0),
        }
    }
}

impl AudioSink for WavTimelineSink {
    fn schedule(&mut self, segment: AudioSegment, start_time: f64) -> Result<()> {
        if segment.sample_rate != self.sample_rate {
            anyhow::bail!(
                "Segment rate {}Hz does not match sink rate {}Hz",
                segment.sample_rate,
                self.sample_rate
            );
        }

        let Some(queue) = self.queue.as_ref() else {
            anyhow::bail!("WAV sink already finalized");
        };

        queue
            .send(TimelineWrite {
                segment,
                start_time,
            })
            .map_err(|_| anyhow::anyhow!("Playback writer stopped"))
    }
}

impl Drop for WavTimelineSink {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to finalize WAV writer on drop: {:#}", e);
        }
    }
}

/// Owns the WAV file on the writer thread
struct TimelineWriter {
    writer: Option<Writer>,
    sample_rate: u32,
    /// Audio-clock time of the first sample in the file
    origin: Option<f64>,
    /// Samples written so far (the file's timeline position)
    written: u64,
}

impl TimelineWriter {
    fn run(mut self, mut pending: mpsc::UnboundedReceiver<TimelineWrite>) -> Result<u64> {
        while let Some(write) = pending.blocking_recv() {
            if let Err(e) = self.write(write) {
                warn!("Playback writer stopped: {:#}", e);
                return Err(e);
            }
        }

        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }
        debug!("Playback timeline finalized ({} samples)", self.written);

        Ok(self.written)
    }

    fn write(&mut self, write: TimelineWrite) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            anyhow::bail!("WAV sink already finalized");
        };

        let origin = *self.origin.get_or_insert(write.start_time);
        let start_sample = ((write.start_time - origin) * self.sample_rate as f64)
            .round()
            .max(0.0) as u64;

        let padding = start_sample.saturating_sub(self.written);
        write_silence(writer, padding)?;
        self.written += padding;

        let pcm = encode_pcm16(&write.segment.samples);
        write_pcm(writer, &pcm)?;
        self.written += pcm.len() as u64;

        Ok(())
    }
}

fn write_silence(writer: &mut Writer, count: u64) -> Result<()> {
    let mut remaining = count;
    while remaining > 0 {
        let block = remaining.min(WRITE_BLOCK as u64) as u32;
        let mut samples = writer.get_i16_writer(block);
        for _ in 0..block {
            samples.write_sample(0i16);
        }
        samples.flush().context("Failed to write silence")?;
        remaining -= block as u64;
    }
    Ok(())
}

fn write_pcm(writer: &mut Writer, pcm: &[i16]) -> Result<()> {
    for chunk in pcm.chunks(WRITE_BLOCK) {
        let mut samples = writer.get_i16_writer(chunk.len() as u32);
        for &sample in chunk {
            samples.write_sample(sample);
        }
        samples
            .flush()
            .context("Failed to write sample to WAV")?;
    }
    Ok(())
}
