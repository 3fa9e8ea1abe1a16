//! Cancellable asynchronous image decoding.
//!
//! [`decode_image`] starts decoding a data URL on a blocking worker and hands
//! back a [`DecodeJob`]. The job resolves exactly once: with the decoded grid,
//! with `None` for an empty input, or with an error when decoding fails or is
//! cancelled.

use std::future::IntoFuture;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use viewer_core::{CanvasError, CanvasResult, PixelGrid};

use crate::codec;

/// Cancels a running [`DecodeJob`].
#[derive(Debug)]
pub struct DecodeCanceller(oneshot::Sender<()>);

impl DecodeCanceller {
    /// Request cancellation. The job resolves to
    /// [`CanvasError::DecodeCancelled`] unless decoding already finished,
    /// in which case the decoded result is kept.
    pub fn cancel(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug)]
enum JobState {
    Empty,
    Failed(CanvasError),
    Running(JoinHandle<CanvasResult<PixelGrid>>),
}

/// A pending image decode.
#[derive(Debug)]
pub struct DecodeJob {
    state: JobState,
    canceller: Option<DecodeCanceller>,
}

impl DecodeJob {
    /// Whether the job resolves to `None` without doing any work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, JobState::Empty)
    }

    /// Detach the canceller so another task can cancel while this one waits.
    pub fn take_canceller(&mut self) -> Option<DecodeCanceller> {
        self.canceller.take()
    }

    /// Cancel the job.
    pub fn cancel(&mut self) {
        if let Some(canceller) = self.canceller.take() {
            canceller.cancel();
        }
    }

    /// Wait for the decode to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DecodeFailed`] when the payload is not a
    /// decodable image, and [`CanvasError::DecodeCancelled`] after
    /// cancellation.
    pub async fn wait(self) -> CanvasResult<Option<PixelGrid>> {
        let Self { state, canceller } = self;
        let result = match state {
            JobState::Empty => Ok(None),
            JobState::Failed(err) => Err(err),
            JobState::Running(handle) => match handle.await {
                Ok(result) => result.map(Some),
                Err(e) if e.is_cancelled() => Err(CanvasError::DecodeCancelled),
                Err(e) => Err(CanvasError::DecodeFailed(format!("decode task failed: {e}"))),
            },
        };
        drop(canceller);
        result
    }
}

impl IntoFuture for DecodeJob {
    type Output = CanvasResult<Option<PixelGrid>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

/// Start decoding a data URL.
///
/// An empty string yields a job that resolves to `Ok(None)` without spawning
/// anything. Otherwise the work is spawned on the current Tokio runtime; with
/// no runtime available the job resolves to [`CanvasError::DecodeFailed`].
#[must_use]
pub fn decode_image(encoded: &str) -> DecodeJob {
    if encoded.is_empty() {
        return DecodeJob {
            state: JobState::Empty,
            canceller: None,
        };
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("Image decode requested outside of an async runtime");
        return DecodeJob {
            state: JobState::Failed(CanvasError::DecodeFailed(
                "no async runtime available".to_string(),
            )),
            canceller: None,
        };
    };

    let (cancel_tx, mut cancel_rx) = oneshot::channel();
    let url = encoded.to_string();
    let handle = runtime.spawn(async move {
        let mut work = tokio::task::spawn_blocking(move || {
            codec::decode_data_url(&url).map(|image| PixelGrid::from_image_data(&image))
        });
        tokio::select! {
            biased;
            Ok(()) = &mut cancel_rx => {
                if work.is_finished() {
                    // Decoding won the race; the result is already there.
                    return finish(work.await);
                }
                tracing::debug!("Image decode cancelled");
                Err(CanvasError::DecodeCancelled)
            }
            joined = &mut work => finish(joined),
        }
    });

    DecodeJob {
        state: JobState::Running(handle),
        canceller: Some(DecodeCanceller(cancel_tx)),
    }
}

fn finish(
    joined: Result<CanvasResult<PixelGrid>, tokio::task::JoinError>,
) -> CanvasResult<PixelGrid> {
    let result = joined
        .map_err(|e| CanvasError::DecodeFailed(format!("decode worker failed: {e}")))
        .and_then(|result| result);
    if let Err(ref e) = result {
        tracing::warn!("Image decode failed: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewer_core::ImageData;

    #[tokio::test]
    async fn test_empty_string_resolves_to_none() {
        let job = decode_image("");
        assert!(job.is_empty());
        assert!(job.await.unwrap().is_none());
    }

    #[test]
    fn test_empty_string_needs_no_runtime() {
        let job = decode_image("");
        assert!(job.is_empty());
    }

    #[test]
    fn test_no_runtime_fails_instead_of_panicking() {
        let job = decode_image("data:image/png;base64,AAAA");
        assert!(matches!(job.state, JobState::Failed(CanvasError::DecodeFailed(_))));
    }

    #[tokio::test]
    async fn test_decode_round_trip() {
        let image = ImageData::from_raw(1, 2, vec![1, 2, 3, 255, 4, 5, 6, 255]).unwrap();
        let encoded = codec::encode_png_data_url(&image).unwrap();
        let grid = decode_image(encoded.as_str()).await.unwrap().unwrap();
        assert_eq!(grid, PixelGrid::from_image_data(&image));
    }

    #[tokio::test]
    async fn test_invalid_payload_fails() {
        let result = decode_image("data:image/png;base64,aGVsbG8=").await;
        assert!(matches!(result, Err(CanvasError::DecodeFailed(_))));
    }

    #[tokio::test]
    async fn test_cancel_after_decode_finished_keeps_result() {
        let image = ImageData::from_raw(1, 1, vec![4, 5, 6, 255]).unwrap();
        let encoded = codec::encode_png_data_url(&image).unwrap();
        let mut job = decode_image(encoded.as_str());

        // Let the job start its worker, then block this thread so the job
        // is not polled again before the worker finishes and cancel lands.
        tokio::task::yield_now().await;
        std::thread::sleep(std::time::Duration::from_millis(300));
        job.cancel();

        let grid = job.await.unwrap().unwrap();
        assert_eq!(grid, PixelGrid::from_image_data(&image));
    }

    #[tokio::test]
    async fn test_dropped_canceller_does_not_cancel() {
        let image = ImageData::from_raw(1, 1, vec![9, 9, 9, 255]).unwrap();
        let encoded = codec::encode_png_data_url(&image).unwrap();
        let mut job = decode_image(encoded.as_str());
        drop(job.take_canceller());
        assert!(job.await.unwrap().is_some());
    }
}
