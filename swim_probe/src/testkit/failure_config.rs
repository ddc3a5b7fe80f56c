use crate::core::PeerId;
use im::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env::var;
use std::time::Duration;

/// Drop probability read from `SWIM_PACKET_DROP`, `0.0` if unset.
pub static PACKET_DROP: Lazy<f64> = Lazy::new(|| {
  var("SWIM_PACKET_DROP")
    .map(|x| x.parse().ok())
    .ok()
    .flatten()
    .unwrap_or(0.0)
});

/// Delay range in milliseconds read from `SWIM_MIN_DELAY` and `SWIM_MAX_DELAY`. Both must be set
/// and ordered.
pub static DELAY: Lazy<Option<(Duration, Duration)>> = Lazy::new(|| {
  var("SWIM_MIN_DELAY")
    .map(|x| x.parse().ok().map(Duration::from_millis))
    .ok()
    .flatten()
    .zip(
      var("SWIM_MAX_DELAY")
        .map(|x| x.parse().ok().map(Duration::from_millis))
        .ok()
        .flatten(),
    )
    .filter(|(x, y)| x <= y)
});

/// How unreliable delivery to a peer is.
#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct FailureConfig {
  /// Probability that a datagram is silently dropped.
  pub drop_prob: f64,
  /// Uniform delay range applied to datagrams that are not dropped.
  pub delay: Option<(Duration, Duration)>,
}
impl FailureConfig {
  /// The configuration described by [`PACKET_DROP`] and [`DELAY`].
  pub fn from_env() -> FailureConfig {
    FailureConfig {
      drop_prob: *PACKET_DROP,
      delay: *DELAY,
    }
  }
}

/// A group-wide [`FailureConfig`] with per-peer overrides.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct FailureConfigMap {
  /// Applies to every peer without an override.
  pub cluster_wide: FailureConfig,
  /// Overrides by recipient.
  pub node_wide: HashMap<PeerId, FailureConfig>,
}
impl FailureConfigMap {
  /// The configuration for datagrams sent to `peer`.
  pub fn get(&self, peer: &PeerId) -> &FailureConfig {
    self.node_wide.get(peer).unwrap_or(&self.cluster_wide)
  }
}

#[test]
fn test_override_lookup() {
  let mut map = FailureConfigMap::default();
  map.cluster_wide.drop_prob = 0.1;
  map.node_wide.insert(
    PeerId::from("b"),
    FailureConfig {
      drop_prob: 1.0,
      delay: None,
    },
  );
  assert_eq!(map.get(&PeerId::from("b")).drop_prob, 1.0);
  assert_eq!(map.get(&PeerId::from("c")).drop_prob, 0.1);
}
