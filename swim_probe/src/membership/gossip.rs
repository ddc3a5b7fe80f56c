use crate::core::PeerId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What happened to a member.
#[derive(
  Serialize,
  Deserialize,
  Hash,
  PartialEq,
  Eq,
  Ord,
  PartialOrd,
  Clone,
  Copy,
  Debug,
)]
pub enum GossipKind {
  /// Admitted to the group.
  Joined,
  /// Stopped answering probes.
  Failed,
  /// Left voluntarily.
  Left,
}

/// One membership change, keyed by what happened and to whom.
#[derive(Serialize, Deserialize, Hash, PartialEq, Eq, Ord, PartialOrd, Clone, Debug)]
pub struct GossipRecord {
  /// The change.
  pub kind: GossipKind,
  /// The member it happened to.
  pub subject: PeerId,
}
impl GossipRecord {
  /// `subject` joined.
  pub fn joined(subject: PeerId) -> GossipRecord {
    GossipRecord { kind: GossipKind::Joined, subject }
  }

  /// `subject` was detected as failed.
  pub fn failed(subject: PeerId) -> GossipRecord {
    GossipRecord { kind: GossipKind::Failed, subject }
  }

  /// `subject` left.
  pub fn left(subject: PeerId) -> GossipRecord {
    GossipRecord { kind: GossipKind::Left, subject }
  }
}

/// Records waiting to be piggybacked, each with the round it expires in.
///
/// A record whose expiry is at or before the current round is stale: [`prune`](Self::prune)
/// drops it and [`live`](Self::live) never returns it.
#[derive(Clone, Debug, Default)]
pub struct GossipBuffer {
  entries: Arc<RwLock<im::HashMap<GossipRecord, u64>>>,
}
impl GossipBuffer {
  fn read(&self) -> RwLockReadGuard<'_, im::HashMap<GossipRecord, u64>> {
    self.entries.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, im::HashMap<GossipRecord, u64>> {
    self.entries.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Inserts `record` unless it is already buffered. Returns the expiry now in effect, which is
  /// the existing one if there was one.
  pub fn insert_if_absent(&self, record: GossipRecord, expiry: u64) -> u64 {
    *self.write().entry(record).or_insert(expiry)
  }

  /// Inserts `record`, replacing the expiry of an existing entry.
  pub fn insert(&self, record: GossipRecord, expiry: u64) {
    self.write().insert(record, expiry);
  }

  /// Drops every record that expires at or before `round`. Returns how many were dropped.
  pub fn prune(&self, round: u64) -> usize {
    let mut entries = self.write();
    let before = entries.len();
    entries.retain(|_, expiry| *expiry > round);
    before - entries.len()
  }

  /// Records still live in `round`, in a stable order.
  pub fn live(&self, round: u64) -> Vec<GossipRecord> {
    let mut live = self
      .read()
      .iter()
      .filter(|(_, expiry)| **expiry > round)
      .map(|(record, _)| record.clone())
      .collect::<Vec<_>>();
    live.sort();
    live
  }

  /// The expiry of `record`, if buffered.
  pub fn expiry(&self, record: &GossipRecord) -> Option<u64> {
    self.read().get(record).copied()
  }

  /// Number of buffered records, stale ones included.
  pub fn len(&self) -> usize {
    self.read().len()
  }

  /// Whether nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  /// An O(1) copy of the buffer.
  pub fn snapshot(&self) -> im::HashMap<GossipRecord, u64> {
    self.read().clone()
  }
}

#[cfg(test)]
use maplit::hashmap;

#[test]
fn test_insert_if_absent_keeps_first_expiry() {
  let buf = GossipBuffer::default();
  let b = GossipRecord::failed(PeerId::from("b"));
  assert_eq!(buf.insert_if_absent(b.clone(), 10), 10);
  assert_eq!(buf.insert_if_absent(b.clone(), 25), 10);
  assert_eq!(buf.expiry(&b), Some(10));
  // Different kind, same subject: a separate record.
  assert_eq!(buf.insert_if_absent(GossipRecord::left(PeerId::from("b")), 25), 25);
  assert_eq!(buf.len(), 2);
  buf.insert(b.clone(), 30);
  assert_eq!(buf.expiry(&b), Some(30));
}

#[test]
fn test_prune_at_or_before_round() {
  let buf = GossipBuffer::default();
  let records = hashmap! {
    GossipRecord::failed(PeerId::from("b")) => 4,
    GossipRecord::left(PeerId::from("c")) => 5,
    GossipRecord::joined(PeerId::from("d")) => 6,
  };
  for (record, expiry) in records {
    buf.insert(record, expiry);
  }
  assert_eq!(buf.prune(3), 0);
  assert_eq!(buf.prune(5), 2);
  assert_eq!(buf.live(5), vec![GossipRecord::joined(PeerId::from("d"))]);
  assert!(buf.live(6).is_empty());
  assert_eq!(buf.len(), 1);
}

#[test]
fn test_live_skips_stale_without_pruning() {
  let buf = GossipBuffer::default();
  buf.insert(GossipRecord::failed(PeerId::from("b")), 2);
  buf.insert(GossipRecord::failed(PeerId::from("c")), 9);
  assert_eq!(buf.live(2), vec![GossipRecord::failed(PeerId::from("c"))]);
  assert_eq!(buf.len(), 2);
}
