//! The prober: round scheduling, direct and indirect probing, failure declaration and the leave
//! sequence.
//!
//! ### Round Budget
//! A round is exactly one [`protocol_period`](ProberConfig::protocol_period) long. The direct
//! ping gets up to [`ping_timeout`](ProberConfig::ping_timeout) of it and indirect probing gets
//! whatever is left, so both phases together never exceed the period. A round that finishes
//! early sleeps out the remainder.
//!
//! ```ignore
//! let membership = Membership::new(peers);
//! let mut prober = Prober::new(
//!   ProberConfig::default(),
//!   Identity::new(me, introducer),
//!   membership.clone(),
//!   Arc::new(UdpTransport::new(socket.clone(), PidResolver::new())),
//!   Arc::new(LogSpread::default()),
//! );
//! let events = prober.subscribe();
//! let handle = prober.spawn();
//! // ... the receiver calls membership.ack.set() on replies ...
//! let report = handle.leave().await?;
//! ```

mod config;
mod events;
mod handle;
mod prober;
mod shuffle;

#[rustfmt::skip]
pub use {
  config::ProberConfig,
  events::ProbeEvent,
  events::ProbePhase,
  events::ProbeReport,
  events::ProbeState,
  handle::ProberHandle,
  prober::Prober,
  shuffle::Shuffled,
};
