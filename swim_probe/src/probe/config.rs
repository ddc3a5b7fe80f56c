use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configures a [`Prober`](crate::probe::Prober).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct ProberConfig {
  /// How long the direct ping waits for an ack before indirect probing starts.
  ///
  /// default: `300 milliseconds`
  pub ping_timeout: Duration,
  /// The length of every round, direct and indirect phases included. Rounds that finish early
  /// sleep out the rest, so probe and gossip traffic stay at one message per period.
  ///
  /// default: `1 second`
  pub protocol_period: Duration,
  /// The number of peers asked to probe a silent peer on this node's behalf.
  ///
  /// default: `2`
  pub subgroup_k: usize,
  /// How long the prober sleeps before looking again when there is nobody to probe.
  ///
  /// default: `1 second`
  pub empty_backoff: Duration,
  /// How many undelivered [`ProbeEvent`](crate::probe::ProbeEvent)s a subscriber may fall
  /// behind before newer events are dropped.
  ///
  /// default: `1024`
  pub event_capacity: usize,
}
impl Default for ProberConfig {
  #[inline]
  fn default() -> Self {
    ProberConfig {
      ping_timeout: Duration::from_millis(300),
      protocol_period: Duration::from_millis(1000),
      subgroup_k: 2,
      empty_backoff: Duration::from_millis(1000),
      event_capacity: 1024,
    }
  }
}
impl ProberConfig {
  /// Checks that both probing phases fit in one protocol period.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.protocol_period == Duration::ZERO {
      return Err(ConfigError::ZeroPeriod);
    }
    if self.ping_timeout > self.protocol_period {
      return Err(ConfigError::PingTimeoutExceedsPeriod {
        ping_timeout: self.ping_timeout,
        protocol_period: self.protocol_period,
      });
    }
    if self.subgroup_k == 0 {
      return Err(ConfigError::EmptySubgroup);
    }
    Ok(())
  }
}

#[test]
fn test_default_config_is_valid() {
  assert_eq!(ProberConfig::default().validate(), Ok(()));
}

#[test]
fn test_invalid_configs() {
  let mut cfg = ProberConfig::default();
  cfg.ping_timeout = Duration::from_millis(1500);
  assert_eq!(
    cfg.validate(),
    Err(ConfigError::PingTimeoutExceedsPeriod {
      ping_timeout: Duration::from_millis(1500),
      protocol_period: Duration::from_millis(1000),
    })
  );
  cfg.ping_timeout = cfg.protocol_period;
  assert_eq!(cfg.validate(), Ok(()));
  cfg.subgroup_k = 0;
  assert_eq!(cfg.validate(), Err(ConfigError::EmptySubgroup));
  cfg.protocol_period = Duration::ZERO;
  assert_eq!(cfg.validate(), Err(ConfigError::ZeroPeriod));
}

#[test]
fn test_config_serde() {
  let cfg = ProberConfig {
    subgroup_k: 3,
    ..ProberConfig::default()
  };
  let bytes = serde_cbor::to_vec(&cfg).unwrap();
  assert_eq!(serde_cbor::from_slice::<ProberConfig>(&bytes).unwrap(), cfg);
}
