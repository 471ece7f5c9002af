//! The per-frame orchestration loop.
//!
//! One iteration: fetch → encode → infer → decode → render → show → poll.
//! Encoding failures skip the frame; end-of-stream, a cancel input, or a
//! fatal inference/display error terminates the session. The session owns
//! the source and the display, so their resources are released exactly
//! once no matter which path terminated the loop.

use tracing::{debug, info, warn};

use crate::annotate::{Annotator, ColorMap};
use crate::client::Infer;
use crate::config::SessionConfig;
use crate::display::DisplaySink;
use crate::encode::FrameEncoder;
use crate::error::{InferenceError, SessionError};
use crate::source::FrameSource;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The source ran out of frames
    EndOfStream,
    /// A quit input arrived at the display poll
    Cancelled,
}

/// Counters for one completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_seen: u64,
    /// Frames dropped by a recoverable encoding failure
    pub frames_skipped: u64,
    pub frames_rendered: u64,
    pub boxes_drawn: u64,
    /// Distinct identities assigned a color
    pub identities: usize,
    pub exit: ExitReason,
}

/// One run of the pipeline from source-open to termination.
pub struct Session<S, E, I, D> {
    source: S,
    encoder: E,
    client: I,
    display: D,
    annotator: Annotator,
    colors: ColorMap,
    config: SessionConfig,
}

impl<S, E, I, D> Session<S, E, I, D>
where
    S: FrameSource,
    E: FrameEncoder,
    I: Infer,
    D: DisplaySink,
{
    pub fn new(
        source: S,
        encoder: E,
        client: I,
        display: D,
        annotator: Annotator,
        colors: ColorMap,
        config: SessionConfig,
    ) -> Self {
        Self {
            source,
            encoder,
            client,
            display,
            annotator,
            colors,
            config,
        }
    }

    /// Identity→color assignments made so far.
    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    /// Runs the loop to termination.
    pub async fn run(&mut self) -> Result<SessionSummary, SessionError> {
        let mut frames_seen = 0u64;
        let mut frames_skipped = 0u64;
        let mut frames_rendered = 0u64;
        let mut boxes_drawn = 0u64;

        let exit = loop {
            let Some(mut frame) = self.source.next_frame()? else {
                info!("End of stream after {} frames", frames_seen);
                break ExitReason::EndOfStream;
            };
            frames_seen += 1;

            let encoded = match self.encoder.encode(&frame) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Skipping frame {}: {}", frame.index, e);
                    frames_skipped += 1;
                    continue;
                }
            };

            let results = self.client.infer(vec![encoded]).await?;
            let Some(detections) = results.into_iter().next() else {
                // The client enforces cardinality; an empty batch response
                // for a one-image request is malformed.
                return Err(InferenceError::ResultCountMismatch {
                    expected: 1,
                    actual: 0,
                }
                .into());
            };

            if let Some(embedding) = &detections.embedding {
                debug!(
                    "Frame {}: embedding of shape {:?}",
                    frame.index, embedding.shape
                );
            }
            debug!(
                "Frame {}: {} boxes, {} keypoint sets, {} masks",
                frame.index,
                detections.boxes.len(),
                detections.keypoints.len(),
                detections.masks.len()
            );

            self.annotator
                .render(&mut frame, &detections.boxes, &mut self.colors);
            boxes_drawn += detections.boxes.len() as u64;

            self.display.show(&frame)?;
            frames_rendered += 1;

            if self.display.poll_cancel(self.config.poll_timeout)? {
                info!("Cancelled at frame {}", frame.index);
                break ExitReason::Cancelled;
            }
        };

        Ok(SessionSummary {
            frames_seen,
            frames_skipped,
            frames_rendered,
            boxes_drawn,
            identities: self.colors.len(),
            exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::detections::{BoundingBox, Detections};
    use crate::encode::{Codec, EncodedFrame, JpegEncoder};
    use crate::error::{DisplayError, EncodeError, SourceError};
    use crate::labels::LabelTable;
    use crate::source::Frame;

    /// Bumps a counter when dropped; verifies single release.
    struct DropTracker(Arc<AtomicUsize>);

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedSource {
        frames: VecDeque<Frame>,
        fetched: Arc<AtomicUsize>,
        _release: DropTracker,
    }

    impl ScriptedSource {
        fn new(count: u64, fetched: Arc<AtomicUsize>, released: Arc<AtomicUsize>) -> Self {
            Self {
                frames: (0..count).map(|i| Frame::solid(i, 64, 64, [0, 0, 0])).collect(),
                fetched,
                _release: DropTracker(released),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
            let frame = self.frames.pop_front();
            if frame.is_some() {
                self.fetched.fetch_add(1, Ordering::SeqCst);
            }
            Ok(frame)
        }
    }

    /// Fails on a specific frame index, passes everything else through.
    struct FlakyEncoder {
        fail_on: u64,
        inner: JpegEncoder,
    }

    impl FrameEncoder for FlakyEncoder {
        fn encode(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
            if frame.index == self.fail_on {
                return Err(EncodeError::InvalidBuffer {
                    index: frame.index,
                    len: 0,
                    width: frame.width(),
                    height: frame.height(),
                });
            }
            self.inner.encode(frame)
        }
    }

    struct ScriptedClient {
        responses: VecDeque<Detections>,
        calls: Arc<AtomicUsize>,
    }

    #[tonic::async_trait]
    impl Infer for ScriptedClient {
        async fn infer(
            &mut self,
            frames: Vec<EncodedFrame>,
        ) -> Result<Vec<Detections>, InferenceError> {
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].codec, Codec::Jpeg);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.responses.pop_front().unwrap_or_default()])
        }
    }

    struct FailingClient;

    #[tonic::async_trait]
    impl Infer for FailingClient {
        async fn infer(
            &mut self,
            _frames: Vec<EncodedFrame>,
        ) -> Result<Vec<Detections>, InferenceError> {
            Err(InferenceError::Timeout(Duration::from_secs(1)))
        }
    }

    /// Signals cancellation at the poll following the Nth show.
    struct CancellingDisplay {
        cancel_after_shows: usize,
        shows: usize,
        _release: DropTracker,
    }

    impl DisplaySink for CancellingDisplay {
        fn show(&mut self, _frame: &Frame) -> Result<(), DisplayError> {
            self.shows += 1;
            Ok(())
        }

        fn poll_cancel(&mut self, _timeout: Duration) -> Result<bool, DisplayError> {
            Ok(self.shows >= self.cancel_after_shows)
        }
    }

    fn one_box() -> Detections {
        Detections {
            boxes: vec![BoundingBox {
                xmin: 10.0,
                ymin: 10.0,
                width: 50.0,
                height: 50.0,
                identity: 7,
                confidence: 0.92,
                class_id: 2,
            }],
            ..Detections::default()
        }
    }

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            poll_timeout: Duration::from_millis(0),
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_single_box_session_assigns_one_color() {
        let (fetched, released, calls) = counters();
        let mut session = Session::new(
            ScriptedSource::new(3, fetched.clone(), released.clone()),
            JpegEncoder::default(),
            ScriptedClient {
                responses: VecDeque::from([one_box(), Detections::default(), Detections::default()]),
                calls: calls.clone(),
            },
            CancellingDisplay {
                cancel_after_shows: usize::MAX,
                shows: 0,
                _release: DropTracker(Arc::new(AtomicUsize::new(0))),
            },
            Annotator::new(None, LabelTable::empty()),
            ColorMap::with_seed(42),
            session_config(),
        );

        let summary = session.run().await.unwrap();

        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.frames_seen, 3);
        assert_eq!(summary.frames_rendered, 3);
        // Exactly one rectangle across the whole session
        assert_eq!(summary.boxes_drawn, 1);
        assert_eq!(summary.identities, 1);
        assert!(session.colors().get(7).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_empty_results_leave_no_state() {
        let (fetched, released, calls) = counters();
        let mut session = Session::new(
            ScriptedSource::new(4, fetched, released),
            JpegEncoder::default(),
            ScriptedClient {
                responses: VecDeque::new(),
                calls,
            },
            CancellingDisplay {
                cancel_after_shows: usize::MAX,
                shows: 0,
                _release: DropTracker(Arc::new(AtomicUsize::new(0))),
            },
            Annotator::new(None, LabelTable::empty()),
            ColorMap::with_seed(1),
            session_config(),
        );

        let summary = session.run().await.unwrap();

        assert_eq!(summary.boxes_drawn, 0);
        assert_eq!(summary.identities, 0);
        assert!(session.colors().is_empty());
    }

    #[tokio::test]
    async fn test_encode_failure_skips_frame_without_rpc() {
        let (fetched, released, calls) = counters();
        let mut session = Session::new(
            ScriptedSource::new(3, fetched, released),
            FlakyEncoder {
                fail_on: 1,
                inner: JpegEncoder::default(),
            },
            ScriptedClient {
                responses: VecDeque::new(),
                calls: calls.clone(),
            },
            CancellingDisplay {
                cancel_after_shows: usize::MAX,
                shows: 0,
                _release: DropTracker(Arc::new(AtomicUsize::new(0))),
            },
            Annotator::new(None, LabelTable::empty()),
            ColorMap::with_seed(1),
            session_config(),
        );

        let summary = session.run().await.unwrap();

        // No remote call and no render for the failed frame; processing
        // resumed with the next frame.
        assert_eq!(summary.frames_seen, 3);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.frames_rendered, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.exit, ExitReason::EndOfStream);
    }

    #[tokio::test]
    async fn test_cancellation_stops_fetching_and_releases_once() {
        let (fetched, released, calls) = counters();
        let display_released = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new(
            ScriptedSource::new(5, fetched.clone(), released.clone()),
            JpegEncoder::default(),
            ScriptedClient {
                responses: VecDeque::new(),
                calls,
            },
            CancellingDisplay {
                cancel_after_shows: 2,
                shows: 0,
                _release: DropTracker(display_released.clone()),
            },
            Annotator::new(None, LabelTable::empty()),
            ColorMap::with_seed(1),
            session_config(),
        );

        let summary = session.run().await.unwrap();

        assert_eq!(summary.exit, ExitReason::Cancelled);
        // Frames 3-5 are never fetched from the source
        assert_eq!(fetched.load(Ordering::SeqCst), 2);

        drop(session);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(display_released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inference_failure_is_fatal_but_still_releases() {
        let (fetched, released, _calls) = counters();
        let display_released = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new(
            ScriptedSource::new(5, fetched.clone(), released.clone()),
            JpegEncoder::default(),
            FailingClient,
            CancellingDisplay {
                cancel_after_shows: usize::MAX,
                shows: 0,
                _release: DropTracker(display_released.clone()),
            },
            Annotator::new(None, LabelTable::empty()),
            ColorMap::with_seed(1),
            session_config(),
        );

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Inference(_)));
        assert_eq!(fetched.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(display_released.load(Ordering::SeqCst), 1);
    }
}
