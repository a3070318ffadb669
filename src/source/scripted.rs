use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::capture::{CapturedFrame, ReadError, VideoCapture};
use crate::sync::types::MotionVector;

/// One step of a capture script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptStep {
    /// Deliver a decoded frame carrying this wall-clock timestamp.
    Frame(f64),
    /// Fail the read with a transient error.
    Error,
}

/// What a [`ScriptedCapture`] does once its script is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBehavior {
    /// Block further reads until [`ScriptControl::interrupt`] is called,
    /// like a live stream that has gone quiet.
    Hold,
    /// Keep failing reads, like a stream that has gone away.
    Fail,
}

/// Unblocks a held [`ScriptedCapture`] from another thread.
///
/// After `interrupt`, every pending and future read fails immediately,
/// which lets reader threads observe their stop flag and exit.
#[derive(Debug, Default)]
pub struct ScriptControl {
    interrupted: Mutex<bool>,
    cond: Condvar,
}

impl ScriptControl {
    pub fn interrupt(&self) {
        *self.interrupted.lock() = true;
        self.cond.notify_all();
    }

    fn is_interrupted(&self) -> bool {
        *self.interrupted.lock()
    }

    fn wait_for_interrupt(&self) {
        let mut interrupted = self.interrupted.lock();
        while !*interrupted {
            self.cond.wait(&mut interrupted);
        }
    }
}

/// A fake capture device that plays back a fixed script of frames and
/// read errors, for exercising the engine without real cameras.
///
/// Frames are 2x2 BGR images whose bytes carry the frame index, with a
/// single motion-vector row carrying the same index, so tests can match a
/// delivered record back to the script step that produced it. The pixel
/// buffer is reused between reads, exactly like a real decoder, which
/// makes a missing defensive copy visible in tests.
///
/// URLs beginning with an underscore refuse to open, for failure-path
/// tests.
pub struct ScriptedCapture {
    steps: VecDeque<ScriptStep>,
    end: EndBehavior,
    control: Arc<ScriptControl>,
    scratch: Vec<u8>,
    frame_index: u8,
}

const SCRIPT_FRAME_WIDTH: i32 = 2;
const SCRIPT_FRAME_HEIGHT: i32 = 2;

impl ScriptedCapture {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>, end: EndBehavior) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            end,
            control: Arc::new(ScriptControl::default()),
            scratch: vec![0; (SCRIPT_FRAME_WIDTH * SCRIPT_FRAME_HEIGHT * 3) as usize],
            frame_index: 0,
        }
    }

    /// Script that delivers one frame per timestamp, in order.
    pub fn frames(timestamps: impl IntoIterator<Item = f64>, end: EndBehavior) -> Self {
        Self::new(timestamps.into_iter().map(ScriptStep::Frame), end)
    }

    /// Handle for interrupting a held capture from the test thread.
    pub fn control(&self) -> Arc<ScriptControl> {
        Arc::clone(&self.control)
    }
}

impl VideoCapture for ScriptedCapture {
    fn open(&mut self, url: &str) -> bool {
        !url.starts_with('_')
    }

    fn read(&mut self) -> Result<CapturedFrame<'_>, ReadError> {
        if self.control.is_interrupted() {
            return Err(ReadError("capture interrupted".to_string()));
        }

        let step = match self.steps.pop_front() {
            Some(step) => step,
            None => match self.end {
                EndBehavior::Fail => return Err(ReadError("script exhausted".to_string())),
                EndBehavior::Hold => {
                    self.control.wait_for_interrupt();
                    return Err(ReadError("capture interrupted".to_string()));
                }
            },
        };

        match step {
            ScriptStep::Error => Err(ReadError("scripted read error".to_string())),
            ScriptStep::Frame(timestamp) => {
                let index = self.frame_index;
                self.frame_index = self.frame_index.wrapping_add(1);
                self.scratch.fill(index);
                let mut mv: MotionVector = [0; 10];
                mv[0] = i64::from(index);
                Ok(CapturedFrame {
                    pixels: &self.scratch,
                    width: SCRIPT_FRAME_WIDTH,
                    height: SCRIPT_FRAME_HEIGHT,
                    frame_type: match index % 3 {
                        0 => 'I',
                        1 => 'P',
                        _ => 'B',
                    },
                    motion_vectors: vec![mv],
                    timestamp,
                })
            }
        }
    }

    fn release(&mut self) {
        self.control.interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn plays_frames_in_script_order() {
        let mut cap = ScriptedCapture::frames([1.0, 2.0, 3.0], EndBehavior::Fail);
        assert!(cap.open("scripted://cam-0"));
        for expected in [1.0, 2.0, 3.0] {
            let frame = cap.read().unwrap();
            assert_eq!(frame.timestamp, expected);
            assert_eq!(frame.width, 2);
            assert_eq!(frame.height, 2);
        }
        assert!(cap.read().is_err());
    }

    #[test]
    fn underscore_url_refuses_to_open() {
        let mut cap = ScriptedCapture::frames([], EndBehavior::Fail);
        assert!(!cap.open("_scripted://bad-cam"));
    }

    #[test]
    fn error_steps_fail_individual_reads() {
        let mut cap = ScriptedCapture::new(
            [
                ScriptStep::Frame(1.0),
                ScriptStep::Error,
                ScriptStep::Frame(2.0),
            ],
            EndBehavior::Fail,
        );
        assert!(cap.read().is_ok());
        assert!(cap.read().is_err());
        assert_eq!(cap.read().unwrap().timestamp, 2.0);
    }

    #[test]
    fn pixel_buffer_is_reused_between_reads() {
        let mut cap = ScriptedCapture::frames([1.0, 2.0], EndBehavior::Fail);
        let first = cap.read().unwrap().pixels.to_vec();
        assert!(first.iter().all(|&b| b == 0));
        let second = cap.read().unwrap().pixels.to_vec();
        assert!(second.iter().all(|&b| b == 1));
    }

    #[test]
    fn motion_vector_row_carries_frame_index() {
        let mut cap = ScriptedCapture::frames([1.0, 2.0], EndBehavior::Fail);
        assert_eq!(cap.read().unwrap().motion_vectors[0][0], 0);
        assert_eq!(cap.read().unwrap().motion_vectors[0][0], 1);
    }

    #[test]
    fn hold_blocks_until_interrupted() {
        let mut cap = ScriptedCapture::frames([1.0], EndBehavior::Hold);
        let control = cap.control();
        cap.read().unwrap();

        let waiter = thread::spawn(move || cap.read().map(|_| ()));
        thread::sleep(Duration::from_millis(20));
        control.interrupt();
        assert!(waiter.join().unwrap().is_err());
    }

    #[test]
    fn interrupted_capture_fails_all_reads() {
        let mut cap = ScriptedCapture::frames([1.0, 2.0], EndBehavior::Hold);
        cap.control().interrupt();
        assert!(cap.read().is_err());
        assert!(cap.read().is_err());
    }

    #[test]
    fn release_interrupts_pending_reads() {
        let mut cap = ScriptedCapture::frames([], EndBehavior::Hold);
        cap.release();
        assert!(cap.read().is_err());
    }
}
