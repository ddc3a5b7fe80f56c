use crate::core::PeerId;

/// Where in its round the prober is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeState {
  /// Picking the next peer to probe.
  Select,
  /// Waiting for the candidate's own ack.
  DirectProbe,
  /// Waiting for an ack relayed through the subgroup.
  IndirectProbe,
  /// Nobody answered; deciding what to do with the candidate.
  Declare,
  /// Announcing departure.
  Leaving,
  /// Done.
  Terminated,
}

/// Which phase of a round an ack arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbePhase {
  /// The candidate answered the ping itself.
  Direct,
  /// A reply arrived while the subgroup was probing on this node's behalf.
  Indirect,
}

/// Outcomes a [`Prober`](crate::probe::Prober) reports to its subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeEvent {
  /// A round ended with a reply.
  Acked {
    /// The round.
    round: u64,
    /// The candidate probed in it.
    peer: PeerId,
    /// When the reply arrived.
    phase: ProbePhase,
  },
  /// A peer was removed and its failure queued for gossip.
  Failed {
    /// The round the failure was declared in.
    round: u64,
    /// The removed peer.
    peer: PeerId,
    /// Expiry of the buffered `Failed` record.
    expiry: u64,
  },
  /// The introducer did not answer. It stays in the directory.
  IntroducerUnreachable {
    /// The round.
    round: u64,
    /// The introducer.
    peer: PeerId,
  },
  /// A departure announcement went out.
  LeaveAnnounced {
    /// The round.
    round: u64,
    /// Its recipient.
    peer: PeerId,
  },
  /// The prober stopped.
  Terminated,
}

/// Counters accumulated over a prober's lifetime, returned when it stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeReport {
  /// Probing rounds run, leave rounds excluded.
  pub rounds: u64,
  /// Rounds that ended with a reply.
  pub acked: u64,
  /// Peers declared failed and removed.
  pub failures: u64,
  /// Rounds in which the introducer did not answer.
  pub introducer_timeouts: u64,
  /// Departure announcements sent.
  pub leave_announcements: u64,
  /// Messages the transport refused.
  pub send_failures: u64,
  /// Events dropped because the subscriber fell behind.
  pub dropped_events: u64,
}
