//! Tri-state results and the stream that carries them.
//!
//! Every query on the [`SyncCoordinator`](crate::sync::SyncCoordinator) runs
//! as its own task and reports through a [`ResultStream`]: zero or one
//! [`Outcome::Loading`] followed by exactly one terminal `Success` or `Error`.
//! Dropping the stream, or calling [`ResultStream::cancel`], cancels the task.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, WeatherError};

// Loading + terminal, with room to spare
const STREAM_CAPACITY: usize = 4;

/// One emission on a [`ResultStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Loading,
    Success(T),
    Error(WeatherError),
}

impl<T> Outcome<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// `Success` and `Error` end a stream.
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WeatherError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(WeatherError::kind)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Loading => Outcome::Loading,
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Error(e) => Outcome::Error(e),
        }
    }

    /// `None` while loading, otherwise the terminal result.
    pub fn into_result(self) -> Option<Result<T, WeatherError>> {
        match self {
            Self::Loading => None,
            Self::Success(value) => Some(Ok(value)),
            Self::Error(e) => Some(Err(e)),
        }
    }
}

/// Receiving end of one query task.
#[derive(Debug)]
pub struct ResultStream<T> {
    rx: mpsc::Receiver<Outcome<T>>,
    cancel: CancellationToken,
}

impl<T> ResultStream<T> {
    pub(crate) fn channel() -> (Emitter<T>, Self) {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let cancel = CancellationToken::new();
        let emitter = Emitter {
            tx,
            cancel: cancel.clone(),
        };
        (emitter, Self { rx, cancel })
    }

    /// Next emission, or `None` once the task has finished.
    pub async fn next(&mut self) -> Option<Outcome<T>> {
        self.rx.recv().await
    }

    /// Skip `Loading` and wait for the terminal outcome.
    ///
    /// Returns `None` if the task ended without one (it was cancelled).
    pub async fn terminal(mut self) -> Option<Outcome<T>> {
        while let Some(outcome) = self.next().await {
            if outcome.is_terminal() {
                return Some(outcome);
            }
        }
        None
    }

    /// Stop the task. Nothing further is emitted or written to the cache.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this stream's task, for wiring into a consumer's lifecycle.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Sending end held by a query task.
#[derive(Debug)]
pub(crate) struct Emitter<T> {
    tx: mpsc::Sender<Outcome<T>>,
    cancel: CancellationToken,
}

impl<T> Emitter<T> {
    /// Deliver an outcome. Returns false if the consumer has gone away.
    pub(crate) async fn emit(&self, outcome: Outcome<T>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(outcome).await.is_ok()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the consumer cancels or drops the stream.
    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}
