//! Frame acquisition adapters.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;

use crate::ocr::setup::find_ffmpeg;

/// One decoded frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbaImage,
    /// Milliseconds since capture start, strictly increasing
    pub timestamp_ms: u64,
    /// Position in the acquired sequence (0-based)
    pub index: u64,
}

#[derive(Debug)]
pub enum Poll {
    Frame(Frame),
    /// Nothing new yet (live sources)
    Pending,
    EndOfStream,
}

pub trait FrameSource: Send {
    fn poll(&mut self) -> Result<Poll>;
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

enum Clock {
    /// Fixed spacing derived from the file position (recorded frames)
    Spaced { interval_ms: u64 },
    /// Wall clock since the source was opened (live folders)
    Wall(Instant),
}

/// Image sequence in a directory, read in file-name order.
///
/// In follow mode the directory is rescanned on every poll and new files
/// are returned as they appear; an empty rescan yields `Poll::Pending`.
pub struct DirectorySource {
    dir: PathBuf,
    every_n: u64,
    follow: bool,
    clock: Clock,
    pending: Vec<PathBuf>,
    seen: BTreeSet<PathBuf>,
    scanned: bool,
    /// Number of image files passed over so far (sampled or not)
    position: u64,
    next_index: u64,
    last_timestamp: Option<u64>,
}

impl DirectorySource {
    /// Recorded frame sequence: every `every_n`-th file, `interval_ms` apart.
    pub fn new(dir: &Path, every_n: u32, interval_ms: u64) -> Result<Self> {
        Self::open(dir, every_n, false, Clock::Spaced { interval_ms })
    }

    /// Live folder that a recorder keeps writing snapshots into.
    pub fn follow(dir: &Path) -> Result<Self> {
        Self::open(dir, 1, true, Clock::Wall(Instant::now()))
    }

    fn open(dir: &Path, every_n: u32, follow: bool, clock: Clock) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!("Frame directory not found: {}", dir.display()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            every_n: u64::from(every_n.max(1)),
            follow,
            clock,
            pending: Vec::new(),
            seen: BTreeSet::new(),
            scanned: false,
            position: 0,
            next_index: 0,
            last_timestamp: None,
        })
    }

    /// Collects image files not returned yet, oldest name last (popped first).
    fn rescan(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read frame directory {}", self.dir.display()))?;

        let mut fresh: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if is_image(&path) && !self.seen.contains(&path) {
                fresh.push(path);
            }
        }
        fresh.sort();
        for path in &fresh {
            self.seen.insert(path.clone());
        }
        fresh.reverse();
        fresh.extend(self.pending.drain(..));
        self.pending = fresh;
        self.scanned = true;
        Ok(())
    }

    fn timestamp(&mut self, position: u64) -> u64 {
        let raw = match &self.clock {
            Clock::Spaced { interval_ms } => position * interval_ms,
            Clock::Wall(start) => start.elapsed().as_millis() as u64,
        };
        let ts = match self.last_timestamp {
            Some(last) if raw <= last => last + 1,
            _ => raw,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

impl FrameSource for DirectorySource {
    fn poll(&mut self) -> Result<Poll> {
        if self.follow || !self.scanned {
            self.rescan()?;
        }

        while let Some(path) = self.pending.pop() {
            let position = self.position;
            self.position += 1;
            if position % self.every_n != 0 {
                continue;
            }

            let image = match image::open(&path) {
                Ok(img) => img.to_rgba8(),
                Err(e) => {
                    log::warn!("Skipping undecodable frame {}: {}", path.display(), e);
                    continue;
                }
            };

            let timestamp_ms = self.timestamp(position);
            let index = self.next_index;
            self.next_index += 1;
            return Ok(Poll::Frame(Frame {
                image,
                timestamp_ms,
                index,
            }));
        }

        if self.follow {
            Ok(Poll::Pending)
        } else {
            Ok(Poll::EndOfStream)
        }
    }
}

/// Video file sampled into a temporary image sequence by ffmpeg.
pub struct VideoFileSource {
    frames: DirectorySource,
    // Keeps the extracted frames alive until the source is dropped
    _workdir: TempDir,
}

impl VideoFileSource {
    pub fn open(video: &Path, fps: f32) -> Result<Self> {
        if !video.is_file() {
            return Err(anyhow!("Video file not found: {}", video.display()));
        }
        if !(fps > 0.0) {
            return Err(anyhow!("Sampling rate must be positive, got {}", fps));
        }

        let ffmpeg = find_ffmpeg()?;
        let workdir = tempfile::tempdir().context("Failed to create frame directory")?;
        let pattern = workdir.path().join("frame_%06d.png");

        log::info!("Extracting frames from {} at {} fps", video.display(), fps);
        let output = Command::new(&ffmpeg)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("fps={}", fps))
            .arg(&pattern)
            .output()
            .with_context(|| format!("Failed to run {}", ffmpeg.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("ffmpeg failed: {}", stderr.trim()));
        }

        let interval_ms = (1000.0 / fps).round() as u64;
        let frames = DirectorySource::new(workdir.path(), 1, interval_ms)?;
        Ok(Self {
            frames,
            _workdir: workdir,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn poll(&mut self) -> Result<Poll> {
        self.frames.poll()
    }
}

/// Scripted source for tests: hands out the given polls in order, then
/// reports end of stream.
#[cfg(test)]
pub struct ScriptedSource {
    polls: std::collections::VecDeque<Result<Poll>>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(polls: Vec<Result<Poll>>) -> Self {
        Self { polls: polls.into() }
    }

    /// Frames filled with a flat gray level each.
    pub fn gray_frames(levels: &[u8]) -> Self {
        let polls = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                Ok(Poll::Frame(Frame {
                    image: RgbaImage::from_pixel(16, 16, image::Rgba([level, level, level, 255])),
                    timestamp_ms: i as u64 * 1000,
                    index: i as u64,
                }))
            })
            .collect();
        Self::new(polls)
    }
}

#[cfg(test)]
impl FrameSource for ScriptedSource {
    fn poll(&mut self) -> Result<Poll> {
        self.polls.pop_front().unwrap_or(Ok(Poll::EndOfStream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn write_frame(dir: &Path, name: &str, level: u8) {
        RgbaImage::from_pixel(8, 8, Rgba([level, level, level, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    fn collect(source: &mut dyn FrameSource) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Poll::Frame(frame) = source.poll().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_directory_source_in_name_order() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), "frame_002.png", 20);
        write_frame(dir.path(), "frame_001.png", 10);
        write_frame(dir.path(), "frame_003.png", 30);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::new(dir.path(), 1, 500).unwrap();
        let frames = collect(&mut source);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].image.get_pixel(0, 0)[0], 10);
        assert_eq!(frames[2].image.get_pixel(0, 0)[0], 30);
        assert_eq!(frames.iter().map(|f| f.timestamp_ms).collect::<Vec<_>>(), vec![0, 500, 1000]);
        assert_eq!(frames.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(matches!(source.poll().unwrap(), Poll::EndOfStream));
    }

    #[test]
    fn test_directory_source_samples_every_n() {
        let dir = tempdir().unwrap();
        for i in 0..7 {
            write_frame(dir.path(), &format!("f{:02}.png", i), i as u8 * 10);
        }
        let mut source = DirectorySource::new(dir.path(), 3, 100).unwrap();
        let frames = collect(&mut source);

        let levels: Vec<u8> = frames.iter().map(|f| f.image.get_pixel(0, 0)[0]).collect();
        assert_eq!(levels, vec![0, 30, 60]);
        assert_eq!(frames[1].timestamp_ms, 300);
    }

    #[test]
    fn test_undecodable_frame_is_skipped() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), "a.png", 10);
        std::fs::write(dir.path().join("b.png"), b"garbage").unwrap();
        write_frame(dir.path(), "c.png", 30);

        let mut source = DirectorySource::new(dir.path(), 1, 100).unwrap();
        assert_eq!(collect(&mut source).len(), 2);
    }

    #[test]
    fn test_follow_mode_picks_up_new_files() {
        let dir = tempdir().unwrap();
        let mut source = DirectorySource::follow(dir.path()).unwrap();
        assert!(matches!(source.poll().unwrap(), Poll::Pending));

        write_frame(dir.path(), "0001.png", 10);
        let Poll::Frame(first) = source.poll().unwrap() else {
            panic!("expected a frame");
        };
        assert!(matches!(source.poll().unwrap(), Poll::Pending));

        write_frame(dir.path(), "0002.png", 20);
        let Poll::Frame(second) = source.poll().unwrap() else {
            panic!("expected a frame");
        };
        assert!(second.timestamp_ms > first.timestamp_ms);
        assert_eq!(second.index, 1);
    }

    #[test]
    fn test_missing_directory_is_error() {
        assert!(DirectorySource::new(Path::new("/no/such/frames"), 1, 100).is_err());
    }

    #[test]
    fn test_removed_directory_is_source_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live");
        std::fs::create_dir(&path).unwrap();
        let mut source = DirectorySource::follow(&path).unwrap();
        std::fs::remove_dir(&path).unwrap();
        assert!(source.poll().is_err());
    }
}
