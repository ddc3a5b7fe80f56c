//! State shared between the prober and the receiving side of a node.
//!
//! Every handle here is cheap to clone and refers to the same underlying state. Readers take
//! persistent snapshots (see [`im`]), so a receiver mutating the [`Directory`] or the
//! [`GossipBuffer`] while the prober iterates a snapshot never disturbs the iteration. Updates
//! may be missed for a round; nothing panics.

mod ack;
mod directory;
mod gossip;
mod round;

#[rustfmt::skip]
pub use {
  ack::AckSignal,
  directory::Directory,
  gossip::GossipBuffer,
  gossip::GossipKind,
  gossip::GossipRecord,
  round::RoundCounter,
};

use crate::core::PeerId;

/// The handles a prober and its receiver share.
#[derive(Clone, Default)]
pub struct Membership {
  /// Peers believed alive.
  pub directory: Directory,
  /// Updates waiting to be piggybacked.
  pub gossip: GossipBuffer,
  /// Logical time.
  pub round: RoundCounter,
  /// Raised by the receiver when a reply arrives.
  pub ack: AckSignal,
}
impl Membership {
  /// Starts with `peers` in the directory, an empty buffer and round zero.
  pub fn new<I>(peers: I) -> Membership
  where
    I: IntoIterator<Item = PeerId>,
  {
    Membership {
      directory: peers.into_iter().collect(),
      ..Membership::default()
    }
  }
}
