use crate::core::PeerId;
use crate::error::SendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::net::{lookup_host, UdpSocket};

/// The DNS name or IP address of the machine hosting a peer.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Host {
  /// Needs a lookup before use.
  DNS(String),
  /// Usable as is.
  IP(IpAddr),
}
impl From<String> for Host {
  fn from(s: String) -> Self {
    match IpAddr::from_str(s.as_str()) {
      Ok(ip) => Host::IP(ip),
      Err(_) => Host::DNS(s),
    }
  }
}

/// Maps a [`PeerId`] to the address its datagrams go to.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
  /// Resolves `id`. Ids that were never valid group members are reported as
  /// [`SendError::Unresolved`].
  async fn resolve(&self, id: &PeerId) -> Result<SocketAddr, SendError>;
}

/// Reads the address out of ids shaped `host:port[:incarnation]`. IPv6 hosts are bracketed:
/// `[::1]:7000:12`.
///
/// DNS names are looked up once and remembered, so only the first probe of a peer pays for the
/// lookup. [`prefetch`](Self::prefetch) moves that cost out of the probing rounds entirely.
#[derive(Clone, Debug, Default)]
pub struct PidResolver {
  cache: Arc<RwLock<im::HashMap<PeerId, SocketAddr>>>,
}
impl PidResolver {
  /// Creates a resolver with an empty cache.
  pub fn new() -> PidResolver {
    PidResolver::default()
  }

  /// The remembered address of `id`, if its name has been looked up.
  pub fn cached(&self, id: &PeerId) -> Option<SocketAddr> {
    self.cache.read().unwrap_or_else(PoisonError::into_inner).get(id).copied()
  }

  /// Resolves `ids` ahead of time. Returns how many resolved; the rest are retried on send.
  pub async fn prefetch<'a, I>(&self, ids: I) -> usize
  where
    I: IntoIterator<Item = &'a PeerId>,
  {
    let mut resolved = 0;
    for id in ids {
      if self.resolve(id).await.is_ok() {
        resolved += 1;
      }
    }
    resolved
  }

  /// Splits `id` into its host and UDP port.
  pub fn parse(id: &PeerId) -> Result<(Host, u16), SendError> {
    let unresolved = || SendError::Unresolved(id.clone());
    let s = id.as_str();
    let (host, rest) = match s.strip_prefix('[') {
      Some(bracketed) => {
        let end = bracketed.find(']').ok_or_else(unresolved)?;
        let rest = bracketed[end + 1..].strip_prefix(':').ok_or_else(unresolved)?;
        (&bracketed[..end], rest)
      }
      None => s.split_once(':').ok_or_else(unresolved)?,
    };
    if host.is_empty() {
      return Err(unresolved());
    }
    let port = rest
      .split(':')
      .next()
      .and_then(|p| p.parse::<u16>().ok())
      .ok_or_else(unresolved)?;
    Ok((Host::from(host.to_string()), port))
  }
}
#[async_trait]
impl Resolve for PidResolver {
  async fn resolve(&self, id: &PeerId) -> Result<SocketAddr, SendError> {
    match Self::parse(id)? {
      (Host::IP(ip), port) => Ok(SocketAddr::new(ip, port)),
      (Host::DNS(name), port) => {
        if let Some(addr) = self.cached(id) {
          return Ok(addr);
        }
        let addrs = lookup_host((name.as_str(), port)).await?.collect::<Vec<_>>();
        let addr = addrs
          .iter()
          .find(|a| a.is_ipv4())
          .or_else(|| addrs.first())
          .copied()
          .ok_or_else(|| SendError::Unresolved(id.clone()))?;
        self.cache.write().unwrap_or_else(PoisonError::into_inner).insert(id.clone(), addr);
        Ok(addr)
      }
    }
  }
}

/// A fixed id to address table.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
  table: im::HashMap<PeerId, SocketAddr>,
}
impl StaticResolver {
  /// Creates a new [`StaticResolver`]
  pub fn new(table: im::HashMap<PeerId, SocketAddr>) -> StaticResolver {
    StaticResolver { table }
  }

  /// Adds or replaces an entry.
  pub fn with(mut self, id: PeerId, addr: SocketAddr) -> StaticResolver {
    self.table.insert(id, addr);
    self
  }
}
#[async_trait]
impl Resolve for StaticResolver {
  async fn resolve(&self, id: &PeerId) -> Result<SocketAddr, SendError> {
    self.table.get(id).copied().ok_or_else(|| SendError::Unresolved(id.clone()))
  }
}

/// Fire-and-forget delivery of a single datagram.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
  /// Sends `bytes` to `to`. A successful return says nothing about delivery.
  async fn send(&self, to: &PeerId, bytes: Vec<u8>) -> Result<(), SendError>;
}

/// Sends over a UDP socket shared with the receiving side.
pub struct UdpTransport<R: Resolve> {
  socket: Arc<UdpSocket>,
  resolver: R,
}
impl<R: Resolve> UdpTransport<R> {
  /// Creates a new [`UdpTransport`]
  pub fn new(socket: Arc<UdpSocket>, resolver: R) -> UdpTransport<R> {
    UdpTransport { socket, resolver }
  }

  /// The socket datagrams leave from.
  pub fn socket(&self) -> &Arc<UdpSocket> {
    &self.socket
  }
}
#[async_trait]
impl<R: Resolve> Transport for UdpTransport<R> {
  async fn send(&self, to: &PeerId, bytes: Vec<u8>) -> Result<(), SendError> {
    let addr = self.resolver.resolve(to).await?;
    self.socket.send_to(&bytes, addr).await?;
    Ok(())
  }
}

#[test]
fn test_pid_parse() {
  use std::net::Ipv4Addr;
  let parse = |s: &str| PidResolver::parse(&PeerId::from(s)).ok();
  assert_eq!(
    parse("10.0.0.7:7000:1623"),
    Some((Host::IP(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))), 7000))
  );
  assert_eq!(parse("node-3.local:7001"), Some((Host::DNS("node-3.local".to_string()), 7001)));
  assert_eq!(parse("[::1]:7002:5"), Some((Host::IP(IpAddr::from_str("::1").unwrap()), 7002)));
  assert_eq!(parse("no-port"), None);
  assert_eq!(parse("host:notaport"), None);
  assert_eq!(parse(":7000"), None);
  assert_eq!(parse("[::1"), None);
}

#[test]
fn test_static_resolver() {
  let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
  let resolver = StaticResolver::default().with(PeerId::from("b"), addr);
  let resolved = tokio_test::block_on(resolver.resolve(&PeerId::from("b")));
  assert_eq!(resolved.ok(), Some(addr));
  let missing = tokio_test::block_on(resolver.resolve(&PeerId::from("c")));
  assert!(matches!(missing, Err(SendError::Unresolved(_))));
}

#[test]
fn test_pid_resolver_caches_names() {
  let resolver = PidResolver::new();
  let named = PeerId::from("localhost:7003:1");
  let literal = PeerId::from("127.0.0.1:7004");
  let bad = PeerId::from("no-port");
  let ids = vec![named.clone(), literal.clone(), bad];
  let resolved = tokio_test::block_on(resolver.prefetch(&ids));
  assert_eq!(resolved, 2);
  let addr = resolver.cached(&named).expect("looked up");
  assert_eq!(addr.port(), 7003);
  assert!(addr.ip().is_loopback());
  // Literal addresses need no lookup and are not remembered.
  assert_eq!(resolver.cached(&literal), None);
  let again = tokio_test::block_on(resolver.resolve(&named));
  assert_eq!(again.ok(), Some(addr));
}
