use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Coalesces rapid repeated triggers into a single deferred action.
///
/// Each `call` cancels any pending timer and starts a fresh one, so only
/// the last trigger in a burst ever fires. The action itself should read
/// current state through shared cells at fire time rather than capture
/// values at schedule time.
pub struct Debouncer {
  delay: Duration,
  pending: Option<CancellationToken>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: None,
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  /// Schedule `action` to run after the delay, cancelling any pending run.
  ///
  /// Must be called from within a tokio runtime.
  pub fn call<F, Fut>(&mut self, action: F)
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    self.cancel();

    let token = CancellationToken::new();
    let timer = token.clone();
    let delay = self.delay;

    tokio::spawn(async move {
      tokio::select! {
        _ = tokio::time::sleep(delay) => action().await,
        _ = timer.cancelled() => {}
      }
    });

    self.pending = Some(token);
  }

  /// Cancel the pending action, if any.
  pub fn cancel(&mut self) {
    if let Some(token) = self.pending.take() {
      token.cancel();
    }
  }
}

impl Drop for Debouncer {
  fn drop(&mut self) {
    self.cancel();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn only_the_last_call_in_a_burst_fires() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let fired = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));

    for i in 1..=3 {
      let fired = Arc::clone(&fired);
      let last = Arc::clone(&last);
      debouncer.call(move || async move {
        fired.fetch_add(1, Ordering::SeqCst);
        last.store(i, Ordering::SeqCst);
      });
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn cancel_prevents_the_pending_run() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = Arc::clone(&fired);
    debouncer.call(move || async move {
      handle.fetch_add(1, Ordering::SeqCst);
    });
    debouncer.cancel();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn each_call_restarts_the_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = Arc::clone(&fired);
    debouncer.call(move || async move {
      handle.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(60)).await;
    let handle = Arc::clone(&fired);
    debouncer.call(move || async move {
      handle.fetch_add(1, Ordering::SeqCst);
    });

    // 120ms after the first call: the restarted window has not elapsed.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
  }
}
