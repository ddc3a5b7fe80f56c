//! Identities, the wire format and the collaborators the prober talks through: address
//! resolution, datagram transport and the spread-time oracle.
//!
//! ### Peer Identifiers
//! A [`PeerId`] is an opaque string as far as the prober is concerned. Only [`PidResolver`]
//! looks inside it, expecting `host:port` optionally followed by `:incarnation`.
//!
//! ```ignore
//! let socket = Arc::new(UdpSocket::bind("0.0.0.0:7000").await?);
//! let transport = UdpTransport::new(socket, PidResolver::new());
//! transport.send(&PeerId::from("10.0.0.2:7000:1623"), bytes).await?;
//! ```

mod message;
mod peer;
mod remoting;
mod spread;

#[rustfmt::skip]
pub use {
  message::Message,
  message::MessageBuilder,
  peer::Identity,
  peer::PeerId,
  remoting::Host,
  remoting::PidResolver,
  remoting::Resolve,
  remoting::StaticResolver,
  remoting::Transport,
  remoting::UdpTransport,
  spread::LogSpread,
  spread::SpreadTime,
};
