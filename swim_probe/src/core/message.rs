use crate::core::PeerId;
use crate::error::{DecodeError, SendError};
use crate::membership::GossipRecord;
use serde::{Deserialize, Serialize};

/// Everything the prober puts on the wire, plus the ack the receiver answers with.
///
/// The round is carried as a decimal string so receivers written against older encodings can
/// echo it back without caring about its width.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Message {
  /// A direct probe. Carries the sender's live gossip.
  Ping {
    /// Round the probe was sent in.
    round: String,
    /// The probing node.
    sender: PeerId,
    /// Piggybacked membership updates.
    gossip: Vec<GossipRecord>,
  },
  /// Asks the recipient to probe `target` on the sender's behalf.
  PingReq {
    /// Round the request was sent in.
    round: String,
    /// The probing node.
    sender: PeerId,
    /// The peer that did not answer the direct probe.
    target: PeerId,
  },
  /// A reply to a ping, possibly relayed.
  Ack {
    /// The round being acknowledged.
    round: String,
    /// The acknowledging node.
    sender: PeerId,
  },
}
impl Message {
  /// Encodes this message into a single datagram payload.
  pub fn to_bytes(&self) -> Result<Vec<u8>, SendError> {
    Ok(serde_cbor::to_vec(self)?)
  }

  /// Decodes a datagram payload.
  pub fn from_bytes(bytes: &[u8]) -> Result<Message, DecodeError> {
    Ok(serde_cbor::from_slice(bytes)?)
  }

  /// The round string exactly as sent.
  pub fn round(&self) -> &str {
    match self {
      Message::Ping { round, .. } | Message::PingReq { round, .. } | Message::Ack { round, .. } => {
        round.as_str()
      }
    }
  }

  /// The round as a number, if the sender encoded it as one.
  pub fn round_number(&self) -> Option<u64> {
    self.round().parse().ok()
  }

  /// The node that sent this message.
  pub fn sender(&self) -> &PeerId {
    match self {
      Message::Ping { sender, .. } | Message::PingReq { sender, .. } | Message::Ack { sender, .. } => {
        sender
      }
    }
  }

  /// Piggybacked records. Empty for anything but a ping.
  pub fn gossip(&self) -> &[GossipRecord] {
    match self {
      Message::Ping { gossip, .. } => gossip.as_slice(),
      _ => &[],
    }
  }
}

/// Builds [`Message`]s.
///
/// ```ignore
/// let ping = MessageBuilder::ping(round, &me.id).gossip(buffer.live(round)).build();
/// let bye = MessageBuilder::ping(round, &me.id).leave(&me.id).build();
/// ```
pub struct MessageBuilder {
  msg: Message,
}
impl MessageBuilder {
  /// Starts a ping with an empty piggyback.
  pub fn ping(round: u64, sender: &PeerId) -> MessageBuilder {
    MessageBuilder {
      msg: Message::Ping {
        round: round.to_string(),
        sender: sender.clone(),
        gossip: Vec::new(),
      },
    }
  }

  /// Starts a ping request asking the recipient to probe `target`.
  pub fn ping_req(round: u64, sender: &PeerId, target: &PeerId) -> MessageBuilder {
    MessageBuilder {
      msg: Message::PingReq {
        round: round.to_string(),
        sender: sender.clone(),
        target: target.clone(),
      },
    }
  }

  /// Starts an ack.
  pub fn ack(round: u64, sender: &PeerId) -> MessageBuilder {
    MessageBuilder {
      msg: Message::Ack {
        round: round.to_string(),
        sender: sender.clone(),
      },
    }
  }

  /// Appends records to a ping's piggyback. Other messages carry no gossip and are unchanged.
  pub fn gossip<I>(mut self, records: I) -> MessageBuilder
  where
    I: IntoIterator<Item = GossipRecord>,
  {
    if let Message::Ping { gossip, .. } = &mut self.msg {
      gossip.extend(records);
    }
    self
  }

  /// Announces that `who` is leaving the group.
  pub fn leave(self, who: &PeerId) -> MessageBuilder {
    self.gossip(std::iter::once(GossipRecord::left(who.clone())))
  }

  /// Finishes the message.
  pub fn build(self) -> Message {
    self.msg
  }
}

#[test]
fn test_ping_carries_gossip_and_round() {
  let me = PeerId::from("a:1");
  let ping = MessageBuilder::ping(42, &me)
    .gossip(vec![GossipRecord::failed(PeerId::from("b:1"))])
    .leave(&me)
    .build();
  assert_eq!(ping.round(), "42");
  assert_eq!(ping.round_number(), Some(42));
  assert_eq!(ping.sender(), &me);
  assert_eq!(
    ping.gossip(),
    &[GossipRecord::failed(PeerId::from("b:1")), GossipRecord::left(me.clone())][..]
  );
  let bytes = ping.to_bytes().unwrap();
  assert_eq!(Message::from_bytes(&bytes).unwrap(), ping);
}

#[test]
fn test_gossip_ignored_outside_pings() {
  let me = PeerId::from("a:1");
  let req = MessageBuilder::ping_req(7, &me, &PeerId::from("b:1")).leave(&me).build();
  assert!(req.gossip().is_empty());
  match req {
    Message::PingReq { target, .. } => assert_eq!(target, PeerId::from("b:1")),
    other => panic!("unexpected {:?}", other),
  }
}

#[test]
fn test_garbage_does_not_decode() {
  assert!(Message::from_bytes(&[0xff, 0x00, 0x13]).is_err());
}
