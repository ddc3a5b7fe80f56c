use crate::core::PeerId;
use std::iter::FromIterator;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The set of peers believed alive.
#[derive(Clone, Debug, Default)]
pub struct Directory {
  peers: Arc<RwLock<im::HashSet<PeerId>>>,
}
impl Directory {
  // A writer that panicked left a complete set behind, so poisoning is ignored.
  fn read(&self) -> RwLockReadGuard<'_, im::HashSet<PeerId>> {
    self.peers.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, im::HashSet<PeerId>> {
    self.peers.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Adds a peer. Returns whether it was new.
  pub fn insert(&self, id: PeerId) -> bool {
    self.write().insert(id).is_none()
  }

  /// Removes a peer. Returns whether it was present.
  pub fn remove(&self, id: &PeerId) -> bool {
    self.write().remove(id).is_some()
  }

  /// Whether `id` is currently believed alive.
  pub fn contains(&self, id: &PeerId) -> bool {
    self.read().contains(id)
  }

  /// Number of peers.
  pub fn len(&self) -> usize {
    self.read().len()
  }

  /// Whether there is nobody to probe.
  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  /// An O(1) copy of the current set. Later changes to the directory do not show up in it.
  pub fn snapshot(&self) -> im::HashSet<PeerId> {
    self.read().clone()
  }
}
impl FromIterator<PeerId> for Directory {
  fn from_iter<T: IntoIterator<Item = PeerId>>(iter: T) -> Self {
    Directory {
      peers: Arc::new(RwLock::new(iter.into_iter().collect())),
    }
  }
}

#[test]
fn test_snapshot_is_isolated() {
  let dir = vec!["b", "c"].into_iter().map(PeerId::from).collect::<Directory>();
  let snap = dir.snapshot();
  assert!(dir.remove(&PeerId::from("b")));
  assert!(!dir.remove(&PeerId::from("b")));
  assert!(dir.insert(PeerId::from("d")));
  assert_eq!(snap, im::hashset![PeerId::from("b"), PeerId::from("c")]);
  assert_eq!(dir.snapshot(), im::hashset![PeerId::from("c"), PeerId::from("d")]);
  assert_eq!(dir.len(), 2);
}
