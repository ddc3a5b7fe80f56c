use crate::core::{Message, PeerId, Transport};
use crate::error::SendError;
use crate::membership::AckSignal;
use async_trait::async_trait;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// A datagram captured by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct Sent {
  /// Recipient.
  pub to: PeerId,
  /// The decoded datagram.
  pub msg: Message,
  /// When it was handed to the transport.
  pub at: Instant,
}

type Responder = dyn Fn(&PeerId, &Message) -> Option<Duration> + Send + Sync;

/// Captures every datagram instead of sending it. Optionally plays the receiving side: for each
/// datagram the responder may return a delay after which the [`AckSignal`] is raised.
///
/// ```ignore
/// let (transport, sent) = RecordingTransport::new();
/// // Everybody but "b" answers pings within 50ms.
/// let transport = transport.acking(membership.ack.clone(), |to, msg| match msg {
///   Message::Ping { .. } if to.as_str() != "b" => Some(Duration::from_millis(50)),
///   _ => None,
/// });
/// ```
pub struct RecordingTransport {
  tx: Sender<Sent>,
  ack: Option<(AckSignal, Arc<Responder>)>,
}
impl RecordingTransport {
  /// Creates a silent transport and the channel its captures arrive on.
  pub fn new() -> (RecordingTransport, Receiver<Sent>) {
    let (tx, rx) = unbounded();
    (RecordingTransport { tx, ack: None }, rx)
  }

  /// Answers datagrams through `ack` as `responder` decides.
  pub fn acking<F>(mut self, ack: AckSignal, responder: F) -> RecordingTransport
  where
    F: Fn(&PeerId, &Message) -> Option<Duration> + Send + Sync + 'static,
  {
    let responder: Arc<Responder> = Arc::new(responder);
    self.ack = Some((ack, responder));
    self
  }
}
#[async_trait]
impl Transport for RecordingTransport {
  async fn send(&self, to: &PeerId, bytes: Vec<u8>) -> Result<(), SendError> {
    let msg = Message::from_bytes(&bytes).map_err(|e| SendError::Encode(e.0))?;
    if let Some((ack, responder)) = &self.ack {
      if let Some(delay) = responder(to, &msg) {
        let ack = ack.clone();
        tokio::spawn(async move {
          sleep(delay).await;
          ack.set();
        });
      }
    }
    let _ = self.tx.send(Sent {
      to: to.clone(),
      msg,
      at: Instant::now(),
    });
    Ok(())
  }
}

/// Refuses every datagram with an I/O error.
#[derive(Debug, Default)]
pub struct FailingTransport {
  attempts: AtomicUsize,
}
impl FailingTransport {
  /// How many sends were attempted.
  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }
}
#[async_trait]
impl Transport for FailingTransport {
  async fn send(&self, _: &PeerId, _: Vec<u8>) -> Result<(), SendError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    Err(io::Error::new(io::ErrorKind::ConnectionRefused, "network unreachable").into())
  }
}
