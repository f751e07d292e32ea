//! The pluggable endpoint resolution capability.
//!
//! The chain driver only ever calls [`Resolver::resolve`] when rdns policy
//! or protocol constraints require a literal address before handshake
//! bytes are built; see [`crate::kind::Rdns::forwards_domain_verbatim`].

use crate::error::Error;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Which address family the caller prefers back from [`Resolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyPreference {
    Ipv4,
    Ipv6,
    Either,
}

/// A pluggable hostname resolution capability.
///
/// Treated as a pure function per call: the core holds no resolver state
/// of its own and never caches a result across invocations.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `hostname` to a literal address matching `family` if
    /// possible, otherwise any family. An IP-literal `hostname` is
    /// returned unchanged without performing a system lookup.
    async fn resolve(&self, hostname: &str, family: FamilyPreference) -> Result<IpAddr, Error>;
}

/// The default [`Resolver`], backed by `tokio::net::lookup_host`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioResolver;

#[async_trait]
impl Resolver for TokioResolver {
    async fn resolve(&self, hostname: &str, family: FamilyPreference) -> Result<IpAddr, Error> {
        if let Ok(addr) = hostname.parse::<Ipv4Addr>() {
            return Ok(IpAddr::V4(addr));
        }
        if let Ok(addr) = hostname.parse::<Ipv6Addr>() {
            return Ok(IpAddr::V6(addr));
        }

        // lookup_host requires a socket address; the port is irrelevant to
        // the address it returns, so a dummy one is fine.
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|source| Error::Resolve {
                host: hostname.to_owned(),
                source,
            })?
            .map(|socket_addr| socket_addr.ip())
            .collect();

        let preferred = addrs.iter().find(|addr| match family {
            FamilyPreference::Ipv4 => addr.is_ipv4(),
            FamilyPreference::Ipv6 => addr.is_ipv6(),
            FamilyPreference::Either => true,
        });

        preferred
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| Error::Resolve {
                host: hostname.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned"),
            })
    }
}
