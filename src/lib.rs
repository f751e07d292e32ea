//! # proxy-tunnel
//!
//! An asynchronous client for tunneling TCP (and TLS) connections through
//! chains of SOCKS4, SOCKS4a, SOCKS5, and HTTP CONNECT proxies.
//!
//! The entry points are [`Proxy`] for a single hop and [`ProxyChain`] for an
//! ordered sequence of them; both drive the same handshake engines under
//! [`engine`] and return a type-erased [`stream::BoxedStream`] once the
//! tunnel is established.

/// Byte-level serialization of proxy destinations (SOCKS5 ATYP, SOCKS4
/// IPv4-plus-hostname).
pub mod address;
/// Walking a [`descriptor::ChainSpec`] hop by hop, and the [`ProxyChain`]
/// facade.
pub mod chain;
/// Establishing a single hop's transport, TLS, and handshake.
pub mod connector;
/// Optional username/password credentials.
pub mod credentials;
/// Proxy descriptors, chain specs, and connect requests.
pub mod descriptor;
/// The three handshake state machines: SOCKS4/4a, SOCKS5, HTTP CONNECT.
pub mod engine;
/// The crate's error taxonomy.
pub mod error;
/// The proxy protocol tag and the rdns tri-state policy.
pub mod kind;
/// The public single-proxy facade.
pub mod proxy;
/// The pluggable endpoint resolution capability.
pub mod resolver;
/// The type-erased stream abstraction and the HTTP CONNECT residual-bytes
/// wrapper.
pub mod stream;
/// The timeout envelope bounding a whole chained connect.
pub mod timeout;
/// Proxy-side and destination-side TLS establishment.
pub mod tls;

pub use address::{Endpoint, HostSpec};
pub use chain::ProxyChain;
pub use credentials::Credentials;
pub use descriptor::{ChainSpec, ConnectRequest, ProxyDescriptor};
pub use error::{Error, ProtocolErrorKind, Result};
pub use kind::{ProxyKind, Rdns};
pub use proxy::Proxy;
pub use resolver::{FamilyPreference, Resolver, TokioResolver};
pub use stream::BoxedStream;
pub use timeout::Deadline;
pub use tls::TlsConfig;
