//! Transports and helpers for exercising a [`Prober`](crate::probe::Prober) without a real
//! network: recording what it sends, answering with acks on cue, refusing every send, or
//! dropping and delaying datagrams at random.

mod failure_config;
mod logging;
mod recording;
mod unreliable_transport;

#[rustfmt::skip]
pub use {
  failure_config::FailureConfig,
  failure_config::FailureConfigMap,
  failure_config::DELAY,
  failure_config::PACKET_DROP,
  logging::init_logging,
  recording::FailingTransport,
  recording::RecordingTransport,
  recording::Sent,
  unreliable_transport::UnreliableTransport,
};
