//! Pipeline runner: batch (one thread) and live (acquisition + processing
//! threads joined by the frame queue).

use std::fmt;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use super::differ::FrameDiffer;
use super::processor::{HandProcessor, ProcessorStats};
use super::queue::{create_frame_queue, PauseSignal, StopSignal};
use super::source::{Frame, FrameSource, Poll};
use crate::config::CaptureConfig;
use crate::ocr::ReadRegion;

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEnd {
    /// The source reported end of stream
    Exhausted,
    /// A stop was requested
    Stopped,
    /// The source failed; acquisition shut down in order
    SourceLost(String),
}

impl fmt::Display for PipelineEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEnd::Exhausted => write!(f, "end of input"),
            PipelineEnd::Stopped => write!(f, "stopped"),
            PipelineEnd::SourceLost(reason) => write!(f, "source lost: {}", reason),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub end: PipelineEnd,
    pub frames_acquired: u64,
    pub frames_unchanged: u64,
    pub frames_processed: u64,
    pub processor: ProcessorStats,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} frames acquired, {} unchanged, {} processed, {} hands, {} records",
            self.end,
            self.frames_acquired,
            self.frames_unchanged,
            self.frames_processed,
            self.processor.hands,
            self.processor.records
        )
    }
}

/// Processes every frame of `source` in order on the calling thread.
/// No differencing: recorded input is already sampled.
pub fn run_batch<R: ReadRegion>(
    source: &mut dyn FrameSource,
    processor: &mut HandProcessor<R>,
    stop: &StopSignal,
) -> RunSummary {
    let mut frames = 0;
    let end = loop {
        if stop.is_requested() {
            break PipelineEnd::Stopped;
        }
        match source.poll() {
            Ok(Poll::Frame(frame)) => {
                frames += 1;
                processor.process_frame(&frame);
            }
            Ok(Poll::Pending) => thread::sleep(Duration::from_millis(10)),
            Ok(Poll::EndOfStream) => break PipelineEnd::Exhausted,
            Err(e) => {
                log::error!("Frame source failed: {:#}", e);
                break PipelineEnd::SourceLost(format!("{:#}", e));
            }
        }
    };

    processor.finish();
    log::info!("Batch finished ({}) after {} frames", end, frames);

    RunSummary {
        end,
        frames_acquired: frames,
        frames_unchanged: 0,
        frames_processed: frames,
        processor: processor.stats(),
    }
}

struct AcquisitionStats {
    end: PipelineEnd,
    acquired: u64,
    unchanged: u64,
}

/// Poll delay while acquisition is paused.
const PAUSED_POLL: Duration = Duration::from_millis(100);

/// How long the processing loop waits for a frame before checking whether
/// a status line is due.
const STATUS_POLL: Duration = Duration::from_millis(500);

/// Acquisition loop. Drops its sender on return, which ends processing.
fn acquire(
    source: &mut dyn FrameSource,
    mut differ: FrameDiffer,
    sender: SyncSender<Frame>,
    stop: &StopSignal,
    pause: &PauseSignal,
    interval: Duration,
) -> AcquisitionStats {
    log::info!("Acquisition started");
    let mut acquired = 0;
    let mut unchanged = 0;
    let mut paused = false;

    let end = loop {
        if stop.is_requested() {
            break PipelineEnd::Stopped;
        }
        if pause.is_paused() != paused {
            paused = !paused;
            log::info!("Acquisition {}", if paused { "paused" } else { "resumed" });
        }
        if paused {
            if stop.wait(interval.max(PAUSED_POLL)) {
                break PipelineEnd::Stopped;
            }
            continue;
        }

        match source.poll() {
            Ok(Poll::Frame(frame)) => {
                acquired += 1;
                if !differ.accept(&frame.image) {
                    unchanged += 1;
                    log::debug!("Frame {} unchanged, dropped", frame.index);
                } else if sender.send(frame).is_err() {
                    log::warn!("Processing thread gone, stopping acquisition");
                    break PipelineEnd::Stopped;
                }
            }
            Ok(Poll::Pending) => {}
            Ok(Poll::EndOfStream) => break PipelineEnd::Exhausted,
            Err(e) => {
                log::error!("Frame source failed: {:#}", e);
                break PipelineEnd::SourceLost(format!("{:#}", e));
            }
        }
        if stop.wait(interval) {
            break PipelineEnd::Stopped;
        }
    };

    log::info!("Acquisition finished ({}): {} frames, {} unchanged", end, acquired, unchanged);
    AcquisitionStats { end, acquired, unchanged }
}

/// Processing loop. Drains the queue until the sender is dropped, then
/// flushes the hand in progress. Logs a status line every `status_every`.
fn process<R: ReadRegion>(
    receiver: Receiver<Frame>,
    processor: &mut HandProcessor<R>,
    status_every: Option<Duration>,
) -> u64 {
    log::info!("Processing started");
    let mut processed = 0;
    let mut last_status = Instant::now();
    loop {
        match receiver.recv_timeout(STATUS_POLL) {
            Ok(frame) => {
                processor.process_frame(&frame);
                processed += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if status_every.is_some_and(|every| last_status.elapsed() >= every) {
            log::info!("Status: {} frames processed, {}", processed, processor.status_line());
            last_status = Instant::now();
        }
    }
    processor.finish();
    log::info!("Processing finished: {} frames", processed);
    processed
}

/// Runs acquisition and processing on two scoped threads until the source
/// ends, fails, or `stop` is requested. Every queued frame is processed
/// before returning. While `pause` is set no frames are acquired.
pub fn run_live<R: ReadRegion + Send>(
    source: &mut dyn FrameSource,
    processor: &mut HandProcessor<R>,
    capture: &CaptureConfig,
    differ: FrameDiffer,
    stop: &StopSignal,
    pause: &PauseSignal,
) -> RunSummary {
    let (sender, receiver) = create_frame_queue(capture.queue_capacity);
    let interval = Duration::from_millis(capture.sample_interval_ms);
    let status_every = (capture.status_interval_secs > 0).then(|| Duration::from_secs(capture.status_interval_secs));

    let (acquisition, processed) = thread::scope(|scope| {
        let processing = scope.spawn(|| process(receiver, processor, status_every));
        let acquisition = acquire(source, differ, sender, stop, pause, interval);
        let processed = match processing.join() {
            Ok(processed) => processed,
            Err(_) => {
                log::error!("Processing thread panicked");
                0
            }
        };
        (acquisition, processed)
    });

    RunSummary {
        end: acquisition.end,
        frames_acquired: acquisition.acquired,
        frames_unchanged: acquisition.unchanged,
        frames_processed: processed,
        processor: processor.stats(),
    }
}
