//! Handle to a call running in the background

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{RestError, RestResult};

/// A call started with [`RequestBuilder::enqueue`](crate::RequestBuilder::enqueue)
///
/// Await the handle to get the call's result. Dropping it detaches the call:
/// the request still completes, its result is discarded.
///
/// ```no_run
/// # use kraken_rest::KrakenRestClient;
/// # use std::time::Duration;
/// # async fn run(client: KrakenRestClient) -> kraken_rest::RestResult<()> {
/// let handle = client.get_server_time().enqueue();
/// // ... do other work ...
/// let time = handle.timeout(Duration::from_secs(5)).await?;
/// println!("{}", time.rfc1123);
/// # Ok(())
/// # }
/// ```
#[must_use = "dropping a RequestHandle detaches the call"]
pub struct RequestHandle<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Running(JoinHandle<RestResult<T>>),
    Failed(Option<RestError>),
}

impl<T: Send + 'static> RequestHandle<T> {
    /// Spawn `call` on the current tokio runtime
    pub(crate) fn spawn<F>(call: F) -> Self
    where
        F: Future<Output = RestResult<T>> + Send + 'static,
    {
        let inner = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Inner::Running(runtime.spawn(call)),
            Err(e) => Inner::Failed(Some(RestError::Config(format!(
                "enqueue needs a tokio runtime: {}",
                e
            )))),
        };
        Self { inner }
    }
}

impl<T> RequestHandle<T> {
    /// Abort the call
    ///
    /// Awaiting the handle afterwards yields [`RestError::Cancelled`], unless
    /// the call had already finished, in which case its result is kept.
    pub fn cancel(&self) {
        if let Inner::Running(task) = &self.inner {
            debug!("Cancelling request");
            task.abort();
        }
    }

    /// Check whether the call has completed, failed or been cancelled
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Running(task) => task.is_finished(),
            Inner::Failed(_) => true,
        }
    }

    /// Wait at most `bound` for the result
    ///
    /// When the bound elapses the call is cancelled and
    /// [`RestError::Timeout`] is returned.
    pub async fn timeout(mut self, bound: Duration) -> RestResult<T> {
        if let Inner::Failed(error) = &mut self.inner {
            return Err(error.take().unwrap_or(RestError::Cancelled));
        }

        match tokio::time::timeout(bound, &mut self).await {
            Ok(result) => result,
            Err(_) => {
                self.cancel();
                Err(RestError::Timeout(bound))
            }
        }
    }
}

impl<T> Future for RequestHandle<T> {
    type Output = RestResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Running(task) => Pin::new(task).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => Err(RestError::Cancelled),
            }),
            Inner::Failed(error) => Poll::Ready(Err(error.take().unwrap_or(RestError::Cancelled))),
        }
    }
}

impl<T> std::fmt::Debug for RequestHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_await_result() {
        let handle = RequestHandle::spawn(async { Ok(42u32) });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_error_passes_through() {
        let handle: RequestHandle<u32> = RequestHandle::spawn(async { Err(RestError::AuthRequired) });
        assert!(matches!(handle.await, Err(RestError::AuthRequired)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_call() {
        let handle = RequestHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1u32)
        });
        handle.cancel();
        assert!(matches!(handle.await, Err(RestError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_after_completion_keeps_result() {
        let handle = RequestHandle::spawn(async { Ok("done") });
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        handle.cancel();
        assert_eq!(handle.await.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_call() {
        let handle = RequestHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1u32)
        });
        let result = handle.timeout(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(RestError::Timeout(d)) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    #[should_panic(expected = "boom")]
    async fn test_panic_is_propagated() {
        let handle = RequestHandle::spawn(async {
            let value: Option<u32> = None;
            Ok(value.expect("boom"))
        });
        let _ = handle.await;
    }

    #[test]
    fn test_spawn_outside_runtime() {
        let handle = RequestHandle::spawn(async { Ok(1u32) });
        assert!(handle.is_finished());
        let result = futures::executor::block_on(handle);
        assert!(matches!(result, Err(RestError::Config(_))));
    }

    #[test]
    fn test_timeout_outside_runtime() {
        let handle = RequestHandle::spawn(async { Ok(1u32) });
        let result = futures::executor::block_on(handle.timeout(Duration::from_secs(1)));
        assert!(matches!(result, Err(RestError::Config(_))));
    }
}
