use serde::{Deserialize, Serialize};

/// How many rounds a membership update must stay in circulation to reach, with high
/// probability, every member of a group of `group_size`.
pub trait SpreadTime: Send + Sync + 'static {
  /// Rounds needed for a group of `group_size` members.
  fn rounds(&self, group_size: usize) -> u64;
}
impl<F> SpreadTime for F
where
  F: Fn(usize) -> u64 + Send + Sync + 'static,
{
  fn rounds(&self, group_size: usize) -> u64 {
    self(group_size)
  }
}

/// Epidemic dissemination reaches the whole group in `O(log n)` rounds; this scales that bound.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LogSpread {
  /// Multiplier on `log2(n + 1)`.
  ///
  /// default: `3.0`
  pub factor: f64,
}
impl Default for LogSpread {
  fn default() -> Self {
    LogSpread { factor: 3.0 }
  }
}
impl SpreadTime for LogSpread {
  fn rounds(&self, group_size: usize) -> u64 {
    if group_size == 0 {
      return 0;
    }
    (self.factor * (group_size as f64 + 1.0).log2()).ceil() as u64
  }
}

#[test]
fn test_log_spread() {
  let spread = LogSpread::default();
  assert_eq!(spread.rounds(0), 0);
  assert_eq!(spread.rounds(1), 3);
  assert_eq!(spread.rounds(3), 6);
  assert_eq!(spread.rounds(7), 9);
  assert!(spread.rounds(1000) > spread.rounds(100));
}

#[test]
fn test_closure_spread() {
  let fixed = |_: usize| -> u64 { 4 };
  assert_eq!(SpreadTime::rounds(&fixed, 100), 4);
}
