use crate::core::{Identity, Message, MessageBuilder, PeerId, SpreadTime, Transport};
use crate::membership::{GossipRecord, Membership};
use crate::probe::{
  ProbeEvent, ProbePhase, ProbeReport, ProbeState, ProberConfig, ProberHandle, Shuffled,
};
use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc::{channel, error::TrySendError, Receiver, Sender};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// The probing state machine. Runs one round per protocol period on a dedicated task until it
/// is told to terminate, then announces its departure.
///
/// Every round:
/// 1. draws the next live peer from a shuffled permutation of the directory,
/// 2. advances the round counter, prunes the gossip buffer and pings the peer with the live
///    records piggybacked, waiting up to `ping_timeout` for an ack,
/// 3. on silence, asks up to `subgroup_k` other peers to probe it and waits for whatever is
///    left of the period,
/// 4. on continued silence, removes the peer and queues a `Failed` record for it (unless it is
///    the introducer, which is only reported),
/// 5. sleeps until exactly one protocol period has passed since the round began.
pub struct Prober {
  config: ProberConfig,
  identity: Identity,
  membership: Membership,
  transport: Arc<dyn Transport>,
  spread: Arc<dyn SpreadTime>,
  rng: SmallRng,
  order: Shuffled,
  state: ProbeState,
  events: Option<Sender<ProbeEvent>>,
  report: ProbeReport,
}
impl Prober {
  /// Creates a new [`Prober`]
  pub fn new(
    config: ProberConfig,
    identity: Identity,
    membership: Membership,
    transport: Arc<dyn Transport>,
    spread: Arc<dyn SpreadTime>,
  ) -> Prober {
    Prober {
      config,
      identity,
      membership,
      transport,
      spread,
      rng: SmallRng::from_entropy(),
      order: Shuffled::default(),
      state: ProbeState::Select,
      events: None,
      report: ProbeReport::default(),
    }
  }

  /// Replaces the random source used for peer selection.
  pub fn with_rng(mut self, rng: SmallRng) -> Prober {
    self.rng = rng;
    self
  }

  /// Returns a stream of [`ProbeEvent`]s. Only the latest subscriber receives events. The
  /// stream holds at most [`event_capacity`](ProberConfig::event_capacity) undelivered events;
  /// newer ones are dropped until the subscriber catches up.
  pub fn subscribe(&mut self) -> Receiver<ProbeEvent> {
    let (tx, rx) = channel(self.config.event_capacity.max(1));
    self.events = Some(tx);
    rx
  }

  /// Runs the prober on its own task.
  pub fn spawn(self) -> ProberHandle {
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(self.run(shutdown.clone()));
    ProberHandle::new(shutdown, task)
  }

  /// Probes until `shutdown` is cancelled, then runs the leave sequence. Cancellation is only
  /// observed between rounds; a round in progress always runs to the end of its period.
  pub async fn run(mut self, shutdown: CancellationToken) -> ProbeReport {
    info!(id = %self.identity.id, introducer = %self.identity.introducer, "prober started");
    while !shutdown.is_cancelled() {
      self.round().await;
    }
    self.leave_sequence().await;
    self.transition(ProbeState::Terminated);
    self.emit(ProbeEvent::Terminated);
    info!(id = %self.identity.id, report = ?self.report, "prober terminated");
    self.report
  }

  async fn round(&mut self) {
    self.transition(ProbeState::Select);
    let start = Instant::now();
    let deadline = start + self.config.protocol_period;
    let candidate = match self.select() {
      Some(candidate) => candidate,
      None => {
        debug!(backoff = ?self.config.empty_backoff, "nobody to probe");
        sleep(self.config.empty_backoff).await;
        return;
      }
    };
    self.report.rounds += 1;

    self.transition(ProbeState::DirectProbe);
    let round = self.membership.round.advance();
    self.membership.ack.clear();
    let pruned = self.membership.gossip.prune(round);
    let ping = MessageBuilder::ping(round, &self.identity.id)
      .gossip(self.membership.gossip.live(round))
      .build();
    debug!(round, peer = %candidate, gossip = ping.gossip().len(), pruned, "direct probe");
    self.send(&candidate, &ping).await;
    let direct_wait = self.config.ping_timeout.min(self.config.protocol_period);
    if self.membership.ack.wait(direct_wait).await {
      self.acked(round, candidate, ProbePhase::Direct);
      sleep_until(deadline).await;
      return;
    }

    self.transition(ProbeState::IndirectProbe);
    self.membership.ack.clear();
    let relayers = self.relayers(&candidate);
    debug!(round, peer = %candidate, relayers = %relayers.iter().join(","), "indirect probe");
    for relayer in &relayers {
      let req = MessageBuilder::ping_req(round, &self.identity.id, &candidate).build();
      self.send(relayer, &req).await;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    if self.membership.ack.wait(remaining).await {
      self.acked(round, candidate, ProbePhase::Indirect);
      sleep_until(deadline).await;
      return;
    }

    self.transition(ProbeState::Declare);
    self.declare(round, candidate);
    sleep_until(deadline).await;
  }

  // Draws until a live peer other than ourselves comes up. A permutation that runs out is
  // replaced by a fresh one; `None` once a fresh one yields nobody.
  fn select(&mut self) -> Option<PeerId> {
    let mut refreshed = false;
    loop {
      match self.order.draw(&mut self.rng) {
        Some(id) if id == self.identity.id => continue,
        Some(id) if !self.membership.directory.contains(&id) => {
          trace!(peer = %id, "skipping departed peer");
          continue;
        }
        Some(id) => return Some(id),
        None if refreshed => return None,
        None => {
          refreshed = true;
          self.order = Shuffled::new(&self.membership.directory.snapshot());
        }
      }
    }
  }

  fn relayers(&mut self, target: &PeerId) -> Vec<PeerId> {
    let mut pool = Shuffled::new(&self.membership.directory.snapshot());
    let mut chosen = Vec::with_capacity(self.config.subgroup_k);
    while chosen.len() < self.config.subgroup_k {
      match pool.draw(&mut self.rng) {
        Some(id) if id == *target || id == self.identity.id => continue,
        Some(id) if !self.membership.directory.contains(&id) => continue,
        Some(id) => chosen.push(id),
        None => break,
      }
    }
    chosen
  }

  fn acked(&mut self, round: u64, peer: PeerId, phase: ProbePhase) {
    trace!(round, peer = %peer, ?phase, "acked");
    self.report.acked += 1;
    self.emit(ProbeEvent::Acked { round, peer, phase });
  }

  fn declare(&mut self, round: u64, peer: PeerId) {
    if self.identity.is_introducer(&peer) {
      info!(round, peer = %peer, "introducer failure detected");
      self.report.introducer_timeouts += 1;
      self.emit(ProbeEvent::IntroducerUnreachable { round, peer });
      return;
    }
    let group_size = self.membership.directory.len();
    let expiry = round.saturating_add(self.spread.rounds(group_size));
    self.membership.directory.remove(&peer);
    let record = GossipRecord::failed(peer.clone());
    let expiry = self.membership.gossip.insert_if_absent(record, expiry);
    info!(round, peer = %peer, expiry, "failure detected, member removed");
    self.report.failures += 1;
    self.emit(ProbeEvent::Failed { round, peer, expiry });
  }

  /// Sends a `Left` record for this node to `min(n, spread_time(n))` distinct peers, one per
  /// protocol period, without waiting for replies.
  async fn leave_sequence(&mut self) {
    self.transition(ProbeState::Leaving);
    let peers = self.membership.directory.snapshot().without(&self.identity.id);
    let announcements = (peers.len() as u64).min(self.spread.rounds(peers.len()));
    info!(id = %self.identity.id, announcements, "leaving group");
    let mut order = Shuffled::new(&peers);
    for _ in 0..announcements {
      let start = Instant::now();
      let round = self.membership.round.advance();
      let peer = match order.draw(&mut self.rng) {
        Some(peer) => peer,
        None => break,
      };
      let msg = MessageBuilder::ping(round, &self.identity.id).leave(&self.identity.id).build();
      self.send(&peer, &msg).await;
      self.report.leave_announcements += 1;
      self.emit(ProbeEvent::LeaveAnnounced { round, peer });
      sleep_until(start + self.config.protocol_period).await;
    }
  }

  // Losing a message is indistinguishable from the network dropping it, so failures are only
  // logged and the round's timeouts decide the outcome.
  async fn send(&mut self, to: &PeerId, msg: &Message) {
    let sent = match msg.to_bytes() {
      Ok(bytes) => self.transport.send(to, bytes).await,
      Err(e) => Err(e),
    };
    match sent {
      Ok(()) => trace!(peer = %to, ?msg, "message sent"),
      Err(e) => {
        warn!(peer = %to, error = %e, "send failed");
        self.report.send_failures += 1;
      }
    }
  }

  fn transition(&mut self, state: ProbeState) {
    trace!(from = ?self.state, to = ?state, "state");
    self.state = state;
  }

  fn emit(&mut self, event: ProbeEvent) {
    if let Some(tx) = &self.events {
      match tx.try_send(event) {
        Ok(()) | Err(TrySendError::Closed(_)) => (),
        Err(TrySendError::Full(event)) => {
          trace!(?event, "event stream full, dropping");
          self.report.dropped_events += 1;
        }
      }
    }
  }
}
