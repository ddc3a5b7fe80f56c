//! Errors surfaced by the prober's collaborators. None of them are fatal to the engine.

use crate::core::PeerId;
use std::time::Duration;
use thiserror::Error;

/// Why an outgoing datagram did not leave this node.
#[derive(Debug, Error)]
pub enum SendError {
  /// The [`PeerId`] could not be mapped to a transport address.
  #[error("no address for peer {0}")]
  Unresolved(PeerId),
  /// The message could not be encoded.
  #[error("failed to encode message: {0}")]
  Encode(#[from] serde_cbor::Error),
  /// The socket refused the datagram.
  #[error("datagram send failed: {0}")]
  Io(#[from] std::io::Error),
}

/// A received datagram was not a well-formed message.
#[derive(Debug, Error)]
#[error("failed to decode message: {0}")]
pub struct DecodeError(#[from] pub serde_cbor::Error);

/// A [`ProberConfig`](crate::probe::ProberConfig) that cannot honor the round budget.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  /// The protocol period must be positive.
  #[error("protocol period must be greater than zero")]
  ZeroPeriod,
  /// The direct ping wait cannot be longer than the whole round.
  #[error("ping timeout {ping_timeout:?} exceeds protocol period {protocol_period:?}")]
  PingTimeoutExceedsPeriod {
    /// Configured direct wait.
    ping_timeout: Duration,
    /// Configured round length.
    protocol_period: Duration,
  },
  /// Indirect probing needs at least one relayer.
  #[error("indirect probing subgroup must contain at least one peer")]
  EmptySubgroup,
}
