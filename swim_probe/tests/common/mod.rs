#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use swim_probe::core::{Identity, Message, PeerId, SpreadTime, Transport};
use swim_probe::membership::Membership;
use swim_probe::probe::{ProbeEvent, Prober, ProberConfig};
use swim_probe::testkit::{init_logging, Sent};
use tokio::sync::mpsc::Receiver;

pub const PERIOD: Duration = Duration::from_millis(1000);
pub const PING_TIMEOUT: Duration = Duration::from_millis(300);

pub fn ms(millis: u64) -> Duration {
  Duration::from_millis(millis)
}

pub fn id(s: &str) -> PeerId {
  PeerId::from(s)
}

pub fn peers(ids: &[&str]) -> Vec<PeerId> {
  ids.iter().map(|s| id(s)).collect()
}

pub fn me() -> Identity {
  Identity::new("a", "intro")
}

pub fn config() -> ProberConfig {
  ProberConfig {
    ping_timeout: PING_TIMEOUT,
    protocol_period: PERIOD,
    subgroup_k: 2,
    empty_backoff: PERIOD,
    event_capacity: 64,
  }
}

pub fn prober<T, S>(identity: Identity, membership: &Membership, transport: T, spread: S) -> Prober
where
  T: Transport,
  S: SpreadTime,
{
  prober_with(config(), identity, membership, transport, spread)
}

pub fn prober_with<T, S>(
  config: ProberConfig,
  identity: Identity,
  membership: &Membership,
  transport: T,
  spread: S,
) -> Prober
where
  T: Transport,
  S: SpreadTime,
{
  init_logging();
  Prober::new(config, identity, membership.clone(), Arc::new(transport), Arc::new(spread))
    .with_rng(SmallRng::seed_from_u64(0x5eed))
}

pub fn drain(events: &mut Receiver<ProbeEvent>) -> Vec<ProbeEvent> {
  let mut all = Vec::new();
  while let Ok(event) = events.try_recv() {
    all.push(event);
  }
  all
}

pub fn pings(sent: &[Sent]) -> Vec<&Sent> {
  sent.iter().filter(|s| matches!(s.msg, Message::Ping { .. })).collect()
}

pub fn ping_reqs(sent: &[Sent]) -> Vec<&Sent> {
  sent.iter().filter(|s| matches!(s.msg, Message::PingReq { .. })).collect()
}

pub fn round_of(sent: &Sent) -> u64 {
  sent.msg.round_number().expect("numeric round")
}

pub fn target_of(sent: &Sent) -> &PeerId {
  match &sent.msg {
    Message::PingReq { target, .. } => target,
    other => panic!("not a ping request: {:?}", other),
  }
}

/// Asserts that `later` happened `expected` after `earlier`, allowing for timer granularity.
pub fn assert_gap(earlier: &Sent, later: &Sent, expected: Duration) {
  let gap = later.at.duration_since(earlier.at);
  assert!(
    gap >= expected && gap < expected + ms(5),
    "expected a gap of {:?}, got {:?}",
    expected,
    gap
  );
}
