//! Video sources the detection loop samples from

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// Media playback state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Live feed, always has a current frame
    Live,
    /// File-backed media currently advancing
    Playing,
    /// File-backed media holding its current frame
    Paused,
    /// File-backed media past its last frame
    Ended,
}

/// A video element: captures frames and reports its on-screen size.
pub trait VideoSource: Send + 'static {
    /// Capture the current frame. `Ok(None)` means the source is not ready yet.
    fn capture(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Live displayed size in display pixels, `None` when not laid out.
    fn display_size(&self) -> Option<(f32, f32)>;

    /// Current playback state
    fn playback(&self) -> PlaybackState {
        PlaybackState::Live
    }

    /// Resume file-backed playback
    fn play(&mut self) {}

    /// Pause file-backed playback
    fn pause(&mut self) {}
}

/// A live source that always yields the same still (webcam snapshot or upload)
pub struct StillSource {
    frame: VideoFrame,
    display: Option<(f32, f32)>,
    sequence: u32,
}

impl StillSource {
    pub fn new(frame: VideoFrame) -> Self {
        Self {
            frame,
            display: None,
            sequence: 0,
        }
    }

    /// Load the still from an image file
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        Ok(Self::new(VideoFrame::open(path, 0)?))
    }

    /// Lay the source out at a fixed displayed size
    pub fn with_display_size(mut self, width: f32, height: f32) -> Self {
        self.display = Some((width, height));
        self
    }

    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.display = Some((width, height));
    }
}

impl VideoSource for StillSource {
    fn capture(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        self.sequence = self.sequence.wrapping_add(1);
        let mut frame = self.frame.clone();
        frame.sequence = self.sequence;
        Ok(Some(frame))
    }

    fn display_size(&self) -> Option<(f32, f32)> {
        self.display
            .or(Some((self.frame.width as f32, self.frame.height as f32)))
    }
}

/// File-backed playback over an ordered sequence of image files
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cursor: usize,
    state: PlaybackState,
    current: Option<VideoFrame>,
    display: Option<(f32, f32)>,
}

impl ImageSequence {
    /// Open every image in `dir`, ordered by file name
    pub fn open_dir(dir: &Path) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort();

        info!("Opened image sequence {} with {} frames", dir.display(), paths.len());
        Self::from_paths(paths)
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self, CameraError> {
        if paths.is_empty() {
            return Err(CameraError::Empty);
        }
        Ok(Self {
            paths,
            cursor: 0,
            state: PlaybackState::Paused,
            current: None,
            display: None,
        })
    }

    pub fn with_display_size(mut self, width: f32, height: f32) -> Self {
        self.display = Some((width, height));
        self
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Sequence number of the next frame to be decoded
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl VideoSource for ImageSequence {
    fn capture(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.state != PlaybackState::Playing && self.current.is_some() {
            return Ok(self.current.clone());
        }

        let Some(path) = self.paths.get(self.cursor) else {
            self.state = PlaybackState::Ended;
            return Ok(self.current.clone());
        };

        let index = self.cursor;
        let path = path.clone();
        if self.state == PlaybackState::Playing {
            // An undecodable file is skipped, not retried
            self.cursor += 1;
            if self.cursor >= self.paths.len() {
                self.state = PlaybackState::Ended;
            }
        }

        let frame = VideoFrame::open(&path, index as u32)?;
        debug!("Decoded frame {} from {}", index, path.display());
        self.current = Some(frame.clone());

        Ok(Some(frame))
    }

    fn display_size(&self) -> Option<(f32, f32)> {
        self.display.or_else(|| {
            self.current
                .as_ref()
                .map(|f| (f.width as f32, f.height as f32))
        })
    }

    fn playback(&self) -> PlaybackState {
        self.state
    }

    fn play(&mut self) {
        if self.state != PlaybackState::Ended {
            self.state = PlaybackState::Playing;
        }
    }

    fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "bmp" | "webp"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_sequence(name: &str, count: u32) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("camera-capture-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            RgbImage::from_pixel(8, 6, image::Rgb([i as u8, 0, 0]))
                .save(dir.join(format!("frame_{:03}.png", i)))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"not a frame").unwrap();
        dir
    }

    #[test]
    fn test_still_source_is_live() {
        let mut source = StillSource::new(VideoFrame::new(vec![0; 4 * 2 * 3], 4, 2, 0, 0));
        assert_eq!(source.playback(), PlaybackState::Live);
        assert_eq!(source.display_size(), Some((4.0, 2.0)));
        let a = source.capture().unwrap().unwrap();
        let b = source.capture().unwrap().unwrap();
        assert!(b.sequence > a.sequence);
    }

    #[test]
    fn test_sequence_plays_to_end() {
        let dir = write_sequence("plays", 3);
        let mut seq = ImageSequence::open_dir(&dir).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.display_size(), None);

        seq.play();
        for expected in 0..3u8 {
            let frame = seq.capture().unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0), Some([expected, 0, 0]));
        }
        assert_eq!(seq.playback(), PlaybackState::Ended);
        assert_eq!(seq.display_size(), Some((8.0, 6.0)));

        seq.play();
        assert_eq!(seq.playback(), PlaybackState::Ended);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_sequence_pause_holds_frame() {
        let dir = write_sequence("pause", 3);
        let mut seq = ImageSequence::open_dir(&dir).unwrap();
        seq.play();
        seq.capture().unwrap();
        seq.pause();
        let held = seq.capture().unwrap().unwrap();
        assert_eq!(held.get_pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(seq.position(), 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(matches!(ImageSequence::from_paths(vec![]), Err(CameraError::Empty)));
    }
}
