use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Logical time for the whole node. Only the prober advances it; everyone reads it.
#[derive(Clone, Debug, Default)]
pub struct RoundCounter {
  round: Arc<AtomicU64>,
}
impl RoundCounter {
  /// Starts the next round and returns its number. The first round is `1`.
  pub fn advance(&self) -> u64 {
    self.round.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// The round currently in progress, `0` before the first one.
  pub fn current(&self) -> u64 {
    self.round.load(Ordering::SeqCst)
  }
}

#[test]
fn test_round_counter_shared() {
  let a = RoundCounter::default();
  let b = a.clone();
  assert_eq!(a.current(), 0);
  assert_eq!(a.advance(), 1);
  assert_eq!(b.advance(), 2);
  assert_eq!(a.current(), 2);
}
