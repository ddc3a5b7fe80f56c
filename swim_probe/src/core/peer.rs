use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifies a group member for the lifetime of its membership.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PeerId(String);
impl PeerId {
  /// Wraps an identifier string.
  pub fn new(id: impl Into<String>) -> PeerId {
    PeerId(id.into())
  }

  /// The identifier as it appears on the wire.
  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }
}
impl From<String> for PeerId {
  fn from(s: String) -> Self {
    PeerId(s)
  }
}
impl From<&str> for PeerId {
  fn from(s: &str) -> Self {
    PeerId(s.to_string())
  }
}
impl Borrow<str> for PeerId {
  fn borrow(&self) -> &str {
    self.as_str()
  }
}
impl fmt::Display for PeerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Who this node is, and who introduced it to the group.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
  /// This node's own identifier. It is the sender of every outgoing message.
  pub id: PeerId,
  /// The bootstrap peer. The prober reports it when it stops answering, but never removes it.
  pub introducer: PeerId,
}
impl Identity {
  /// Creates a new [`Identity`]
  pub fn new(id: impl Into<PeerId>, introducer: impl Into<PeerId>) -> Identity {
    Identity {
      id: id.into(),
      introducer: introducer.into(),
    }
  }

  /// Whether `peer` is the introducer.
  pub fn is_introducer(&self, peer: &PeerId) -> bool {
    self.introducer == *peer
  }
}

#[test]
fn test_peer_id_borrow_lookup() {
  let set = maplit::hashset! { PeerId::from("10.0.0.1:7000"), PeerId::from("10.0.0.2:7000") };
  assert!(set.contains("10.0.0.1:7000"));
  assert!(!set.contains("10.0.0.3:7000"));
  assert_eq!(PeerId::new("a:1").to_string(), "a:1");
}

#[test]
fn test_introducer_check() {
  let me = Identity::new("a:1", "intro:1");
  assert!(me.is_introducer(&PeerId::from("intro:1")));
  assert!(!me.is_introducer(&me.id));
}
