use thiserror::Error;

use crate::sync::types::MotionVector;

/// A transient failure while reading one frame. The reader counts these;
/// the source is only retired after `max_read_errors` in a row.
#[derive(Debug, Clone, Error)]
#[error("frame read failed: {0}")]
pub struct ReadError(pub String);

/// One decoded frame as handed out by a capture device.
///
/// `pixels` borrows the device's internal buffer, which may be reused on
/// the next `read` call; callers that keep the frame must copy it. The
/// motion-vector table is freshly allocated per call and ownership
/// transfers with the struct.
#[derive(Debug)]
pub struct CapturedFrame<'a> {
    pub pixels: &'a [u8],
    pub width: i32,
    pub height: i32,
    /// Picture type: `I`, `P`, `B` or `?`.
    pub frame_type: char,
    pub motion_vectors: Vec<MotionVector>,
    /// Wall-clock capture time in seconds (NTP-derived).
    pub timestamp: f64,
}

/// Driver-agnostic capture seam.
///
/// Implemented by whatever decodes the actual streams (an RTSP/H.264
/// decoder in production, [`ScriptedCapture`](super::scripted::ScriptedCapture)
/// in tests). One instance serves exactly one source and is owned by that
/// source's reader thread.
pub trait VideoCapture: Send {
    /// Attempt the initial connect. Returns `false` on failure; the engine
    /// then retires the source without aborting the pipeline.
    fn open(&mut self, url: &str) -> bool;

    /// Block until the next frame is decoded or a read error occurs.
    fn read(&mut self) -> Result<CapturedFrame<'_>, ReadError>;

    /// Close the device. Must be idempotent.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock capture for testing the trait contract, with a reused pixel
    /// buffer like a real decoder.
    struct MockCapture {
        opened: bool,
        scratch: Vec<u8>,
        frames_left: u32,
    }

    impl VideoCapture for MockCapture {
        fn open(&mut self, url: &str) -> bool {
            self.opened = !url.is_empty();
            self.opened
        }

        fn read(&mut self) -> Result<CapturedFrame<'_>, ReadError> {
            if self.frames_left == 0 {
                return Err(ReadError("end of stream".to_string()));
            }
            self.frames_left -= 1;
            self.scratch.fill(self.frames_left as u8);
            Ok(CapturedFrame {
                pixels: &self.scratch,
                width: 1,
                height: 1,
                frame_type: 'I',
                motion_vectors: vec![[0; 10]],
                timestamp: 1.0,
            })
        }

        fn release(&mut self) {
            self.opened = false;
        }
    }

    fn mock(frames: u32) -> MockCapture {
        MockCapture {
            opened: false,
            scratch: vec![0; 3],
            frames_left: frames,
        }
    }

    #[test]
    fn mock_capture_open_succeeds_for_nonempty_url() {
        let mut cap = mock(0);
        assert!(cap.open("rtsp://example/stream"));
        assert!(!cap.open(""));
    }

    #[test]
    fn mock_capture_read_reuses_pixel_buffer() {
        let mut cap = mock(2);
        let first = cap.read().unwrap().pixels.to_vec();
        let second = cap.read().unwrap().pixels.to_vec();
        // Same backing buffer, different contents after each read.
        assert_ne!(first, second);
    }

    #[test]
    fn mock_capture_read_fails_after_exhaustion() {
        let mut cap = mock(1);
        assert!(cap.read().is_ok());
        assert!(cap.read().is_err());
    }

    #[test]
    fn read_error_display_includes_cause() {
        let err = ReadError("connection reset".to_string());
        assert_eq!(err.to_string(), "frame read failed: connection reset");
    }

    #[test]
    fn boxed_capture_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn VideoCapture>>();
    }
}
