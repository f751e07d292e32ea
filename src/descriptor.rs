//! Immutable value types describing proxies and the connect request they
//! are driven towards.

use crate::address::Endpoint;
use crate::credentials::Credentials;
use crate::error::Error;
use crate::kind::{ProxyKind, Rdns};
use crate::tls::TlsConfig;
use std::time::Duration;

/// One hop in a chain: which protocol it speaks, where it listens, and how
/// it should be reached and driven.
#[derive(Clone)]
pub struct ProxyDescriptor {
    pub kind: ProxyKind,
    pub endpoint: Endpoint,
    pub credentials: Option<Credentials>,
    pub rdns: Rdns,
    pub proxy_tls: Option<TlsConfig>,
}

impl std::fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .field("rdns", &self.rdns)
            .field("proxy_tls", &self.proxy_tls.is_some())
            .finish()
    }
}

impl ProxyDescriptor {
    pub fn new(kind: ProxyKind, endpoint: Endpoint) -> ProxyDescriptor {
        ProxyDescriptor {
            kind,
            endpoint,
            credentials: None,
            rdns: Rdns::None,
            proxy_tls: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> ProxyDescriptor {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_rdns(mut self, rdns: Rdns) -> ProxyDescriptor {
        self.rdns = rdns;
        self
    }

    pub fn with_proxy_tls(mut self, tls: TlsConfig) -> ProxyDescriptor {
        self.proxy_tls = Some(tls);
        self
    }

    /// Whether this hop forwards a domain destination verbatim (remote
    /// resolution) rather than requiring the driver to resolve it first.
    pub fn forwards_domain_verbatim(&self) -> bool {
        self.rdns.forwards_domain_verbatim(self.kind)
    }
}

/// A non-empty, ordered sequence of [`ProxyDescriptor`]s. The last entry's
/// handshake targets the caller's ultimate destination; every earlier
/// entry's handshake targets the next entry's endpoint.
#[derive(Debug, Clone)]
pub struct ChainSpec(Vec<ProxyDescriptor>);

impl ChainSpec {
    pub fn new(descriptors: Vec<ProxyDescriptor>) -> Result<ChainSpec, Error> {
        if descriptors.is_empty() {
            return Err(Error::InvalidDescriptor("a proxy chain must have at least one hop".into()));
        }
        Ok(ChainSpec(descriptors))
    }

    pub fn single(descriptor: ProxyDescriptor) -> ChainSpec {
        ChainSpec(vec![descriptor])
    }

    pub fn hops(&self) -> &[ProxyDescriptor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The final destination of a chained connect, plus optional
/// destination-side TLS and the single deadline bounding the whole
/// operation.
#[derive(Clone)]
pub struct ConnectRequest {
    pub dest: Endpoint,
    pub dest_tls: Option<TlsConfig>,
    pub timeout: Option<Duration>,
}

impl ConnectRequest {
    pub fn new(dest: Endpoint) -> ConnectRequest {
        ConnectRequest {
            dest,
            dest_tls: None,
            timeout: None,
        }
    }

    pub fn with_dest_tls(mut self, tls: TlsConfig) -> ConnectRequest {
        self.dest_tls = Some(tls);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> ConnectRequest {
        self.timeout = Some(timeout);
        self
    }
}
