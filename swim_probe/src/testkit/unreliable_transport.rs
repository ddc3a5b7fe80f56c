use crate::core::{PeerId, Transport};
use crate::error::SendError;
use crate::testkit::FailureConfigMap;
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Wraps a [`Transport`], dropping and delaying datagrams according to a [`FailureConfigMap`].
/// Dropped datagrams still report success, as a real lossy network would.
pub struct UnreliableTransport<T: Transport> {
  inner: Arc<T>,
  fail_map: FailureConfigMap,
}
impl<T: Transport> UnreliableTransport<T> {
  /// Creates a new [`UnreliableTransport`]
  pub fn new(inner: Arc<T>, fail_map: FailureConfigMap) -> UnreliableTransport<T> {
    UnreliableTransport { inner, fail_map }
  }
}
#[async_trait]
impl<T: Transport> Transport for UnreliableTransport<T> {
  async fn send(&self, to: &PeerId, bytes: Vec<u8>) -> Result<(), SendError> {
    let fail_cfg = self.fail_map.get(to);
    let mut rng = SmallRng::from_entropy();
    if rng.gen::<f64>() < fail_cfg.drop_prob {
      trace!(peer = %to, "dropped datagram");
      return Ok(());
    }
    let dur = fail_cfg.delay.map(|(min, max)| {
      let range = min.as_millis() as u64..=max.as_millis() as u64;
      Duration::from_millis(rng.gen_range(range))
    });
    match dur {
      Some(dur) => {
        let inner = self.inner.clone();
        let to = to.clone();
        tokio::spawn(async move {
          sleep(dur).await;
          if let Err(e) = inner.send(&to, bytes).await {
            trace!(peer = %to, error = %e, "delayed send failed");
          }
        });
        Ok(())
      }
      None => self.inner.send(to, bytes).await,
    }
  }
}
