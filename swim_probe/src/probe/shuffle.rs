use crate::core::PeerId;
use rand::Rng;

/// A random permutation of a directory snapshot, shuffled lazily: each draw swaps one random
/// remaining member into place (Fisher-Yates), so only the part actually consumed gets shuffled.
///
/// Members are drawn from the snapshot, not the live directory. Callers check the live
/// directory before acting on a draw.
#[derive(Clone, Debug, Default)]
pub struct Shuffled {
  members: Vec<PeerId>,
  next: usize,
}
impl Shuffled {
  /// Starts a fresh permutation of `snapshot`.
  pub fn new(snapshot: &im::HashSet<PeerId>) -> Shuffled {
    Shuffled {
      members: snapshot.iter().cloned().collect(),
      next: 0,
    }
  }

  /// The next member of the permutation, or `None` once it is exhausted.
  pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PeerId> {
    if self.next >= self.members.len() {
      return None;
    }
    let pick = rng.gen_range(self.next..self.members.len());
    self.members.swap(self.next, pick);
    self.next += 1;
    Some(self.members[self.next - 1].clone())
  }

  /// Members not yet drawn.
  pub fn remaining(&self) -> usize {
    self.members.len() - self.next
  }
}

#[cfg(test)]
use rand::{rngs::SmallRng, SeedableRng};

#[test]
fn test_draws_every_member_once() {
  let snapshot = (0..20).map(|i| PeerId::new(format!("p{}", i))).collect::<im::HashSet<_>>();
  let mut rng = SmallRng::seed_from_u64(7);
  let mut shuffled = Shuffled::new(&snapshot);
  let mut drawn = Vec::new();
  while let Some(id) = shuffled.draw(&mut rng) {
    drawn.push(id);
  }
  assert_eq!(shuffled.remaining(), 0);
  assert_eq!(drawn.len(), 20);
  assert_eq!(drawn.into_iter().collect::<im::HashSet<_>>(), snapshot);
}

#[test]
fn test_permutations_differ() {
  let snapshot = (0..20).map(|i| PeerId::new(format!("p{}", i))).collect::<im::HashSet<_>>();
  let mut rng = SmallRng::seed_from_u64(11);
  let mut first = Shuffled::new(&snapshot);
  let mut second = Shuffled::new(&snapshot);
  let a = std::iter::from_fn(|| first.draw(&mut rng)).collect::<Vec<_>>();
  let b = std::iter::from_fn(|| second.draw(&mut rng)).collect::<Vec<_>>();
  assert_ne!(a, b);
}

#[test]
fn test_empty_snapshot() {
  let mut rng = SmallRng::seed_from_u64(1);
  assert_eq!(Shuffled::new(&im::HashSet::new()).draw(&mut rng), None);
}
