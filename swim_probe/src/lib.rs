#![warn(missing_docs)]

//! The probing half of a [SWIM](https://www.cs.cornell.edu/projects/Quicksilver/public_pdfs/SWIM.pdf)
//! failure detector. Each node runs one [`Prober`](crate::probe::Prober) that pings a random peer
//! every protocol period, falls back to indirect probing through a small subgroup of other peers,
//! and declares the peer failed if nobody vouches for it before the period runs out. Failures and
//! departures spread by piggybacking [`GossipRecord`](crate::membership::GossipRecord)s on pings.
//!
//! The receiving side (dispatching inbound pings, acks and ping requests) is not part of this
//! crate. It shares a [`Membership`](crate::membership::Membership) with the prober and calls
//! [`AckSignal::set`](crate::membership::AckSignal::set) when a reply arrives.

pub mod core;
pub mod error;
pub mod membership;
pub mod probe;
pub mod testkit;
