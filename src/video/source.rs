use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;

/// Live video input
///
/// Implementations:
/// - Test pattern (synthetic, always available)
/// - Still image file (stand-in for a fixed camera)
pub trait VideoSource: Send {
    /// Acquire the device
    fn start(&mut self) -> Result<()>;

    /// Current picture. Fails if the source has not been started.
    fn capture(&mut self) -> Result<RgbImage>;

    /// Release the device. Safe to call repeatedly.
    fn stop(&mut self);

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Video input selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInput {
    TestPattern { width: u32, height: u32 },
    File(String),
}

impl VideoInput {
    /// `"test-pattern"` or a path to an image file
    pub fn parse(value: &str, width: u32, height: u32) -> Self {
        match value.trim() {
            "" | "test-pattern" => VideoInput::TestPattern { width, height },
            path => VideoInput::File(path.to_string()),
        }
    }
}

/// Video source factory
pub struct VideoSourceFactory;

impl VideoSourceFactory {
    pub fn create(input: VideoInput) -> Box<dyn VideoSource> {
        match input {
            VideoInput::TestPattern { width, height } => {
                Box::new(TestPatternSource::new(width, height))
            }
            VideoInput::File(path) => Box::new(StillImageSource::new(path)),
        }
    }
}

/// Moving colour bars, one step per captured frame
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_index: u32,
    running: bool,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_index: 0,
            running: false,
        }
    }
}

impl VideoSource for TestPatternSource {
    fn start(&mut self) -> Result<()> {
        self.running = true;
        self.frame_index = 0;
        info!("Test pattern started ({}x{})", self.width, self.height);
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbImage> {
        if !self.running {
            anyhow::bail!("Test pattern is not running");
        }

        let offset = self.frame_index.wrapping_mul(8);
        let (width, height) = (self.width, self.height);
        self.frame_index = self.frame_index.wrapping_add(1);

        Ok(RgbImage::from_fn(width, height, |x, y| {
            let band = ((x + offset % width) % width) * 8 / width;
            let shade = (255 * y / height) as u8;
            Rgb([
                if band & 1 != 0 { 255 } else { shade },
                if band & 2 != 0 { 255 } else { shade / 2 },
                if band & 4 != 0 { 255 } else { 0 },
            ])
        }))
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

/// Serves the same decoded image on every capture
pub struct StillImageSource {
    path: PathBuf,
    image: Option<RgbImage>,
}

impl StillImageSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            image: None,
        }
    }
}

impl VideoSource for StillImageSource {
    fn start(&mut self) -> Result<()> {
        let image = image::open(&self.path)
            .with_context(|| format!("Failed to open image: {}", self.path.display()))?
            .to_rgb8();

        info!(
            "Still image source started from {} ({}x{})",
            self.path.display(),
            image.width(),
            image.height()
        );

        self.image = Some(image);
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbImage> {
        self.image
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Still image source is not running"))
    }

    fn stop(&mut self) {
        self.image = None;
    }

    fn name(&self) -> &str {
        "still-image"
    }
}
