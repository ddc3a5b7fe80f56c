use crate::probe::ProbeReport;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Owns a running [`Prober`](crate::probe::Prober).
pub struct ProberHandle {
  shutdown: CancellationToken,
  task: JoinHandle<ProbeReport>,
}
impl ProberHandle {
  pub(crate) fn new(shutdown: CancellationToken, task: JoinHandle<ProbeReport>) -> ProberHandle {
    ProberHandle { shutdown, task }
  }

  /// Asks the prober to stop after its current round and announce its departure.
  pub fn terminate(&self) {
    self.shutdown.cancel();
  }

  /// Whether termination has been requested.
  pub fn is_terminating(&self) -> bool {
    self.shutdown.is_cancelled()
  }

  /// Waits for the prober to finish its leave sequence.
  pub async fn join(self) -> Result<ProbeReport, JoinError> {
    self.task.await
  }

  /// [`terminate`](Self::terminate) followed by [`join`](Self::join).
  pub async fn leave(self) -> Result<ProbeReport, JoinError> {
    self.terminate();
    self.join().await
  }
}
