use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

/// Raised by the receiver when a reply to an outstanding probe arrives; awaited by the prober.
///
/// A single-slot [`watch`] channel, so a reply that lands between [`clear`](Self::clear) and
/// [`wait`](Self::wait) is never lost. Any reply counts, including a late one from an earlier
/// phase of the same round.
#[derive(Clone, Debug)]
pub struct AckSignal {
  tx: Arc<watch::Sender<bool>>,
}
impl AckSignal {
  /// Creates a lowered signal.
  pub fn new() -> AckSignal {
    let (tx, _) = watch::channel(false);
    AckSignal { tx: Arc::new(tx) }
  }

  /// Raises the signal and wakes any waiter.
  pub fn set(&self) {
    self.tx.send_replace(true);
  }

  /// Lowers the signal ahead of a new wait.
  pub fn clear(&self) {
    self.tx.send_replace(false);
  }

  /// Whether the signal is raised.
  pub fn is_set(&self) -> bool {
    *self.tx.borrow()
  }

  /// Waits up to `limit` for the signal. Returns whether it was raised. A signal that is already
  /// raised returns immediately, even with a zero limit.
  pub async fn wait(&self, limit: Duration) -> bool {
    let mut rx = self.tx.subscribe();
    // Interrupted waits count as timeouts.
    let acked = matches!(timeout(limit, rx.wait_for(|acked| *acked)).await, Ok(Ok(_)));
    acked
  }
}
impl Default for AckSignal {
  fn default() -> Self {
    AckSignal::new()
  }
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out() {
  let ack = AckSignal::new();
  let start = tokio::time::Instant::now();
  assert!(!ack.wait(Duration::from_millis(300)).await);
  let waited = start.elapsed();
  assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(305));
}

#[tokio::test(start_paused = true)]
async fn test_wait_woken_by_set() {
  let ack = AckSignal::new();
  let remote = ack.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(120)).await;
    remote.set();
  });
  let start = tokio::time::Instant::now();
  assert!(ack.wait(Duration::from_millis(300)).await);
  let waited = start.elapsed();
  assert!(waited >= Duration::from_millis(120) && waited < Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_already_set_with_zero_limit() {
  let ack = AckSignal::new();
  ack.set();
  assert!(ack.wait(Duration::from_millis(0)).await);
  ack.clear();
  assert!(!ack.is_set());
  assert!(!ack.wait(Duration::from_millis(0)).await);
}
