//! Walks a [`ChainSpec`] hop by hop, then optionally wraps the final stream
//! in destination-side TLS, and the public [`ProxyChain`] facade over it.

use crate::address::{Endpoint, HostSpec};
use crate::connector;
use crate::descriptor::{ChainSpec, ConnectRequest};
use crate::error::Error;
use crate::proxy::Proxy;
use crate::resolver::{Resolver, TokioResolver};
use crate::stream::BoxedStream;
use crate::timeout::Deadline;
use crate::tls::{self, TlsConfig};
use std::time::Duration;
use tracing::debug;

/// Drives every hop of `chain` towards `request.dest`, under one deadline
/// derived from `request.timeout` and shared across all hops.
///
/// Hop `i < chain.len() - 1` handshakes towards hop `i + 1`'s endpoint; the
/// last hop handshakes towards `request.dest`. On success, the returned
/// stream is wrapped in `request.dest_tls` if present.
async fn drive(chain: &ChainSpec, request: &ConnectRequest, resolver: &dyn Resolver) -> Result<BoxedStream, Error> {
    let deadline = Deadline::from_option(request.timeout);
    let hops = chain.hops();

    let mut stream: Option<BoxedStream> = None;
    for (index, descriptor) in hops.iter().enumerate() {
        let next_hop: &Endpoint = hops.get(index + 1).map(|d| &d.endpoint).unwrap_or(&request.dest);
        debug!(hop = index, kind = ?descriptor.kind, next = %next_hop, "driving hop");
        let established = connector::connect(descriptor, next_hop, stream.take(), resolver, index, &deadline).await?;
        stream = Some(established);
    }

    let stream = stream.expect("ChainSpec is non-empty, so the loop ran at least once");

    match &request.dest_tls {
        Some(dest_tls) => tls::wrap_tls(stream, dest_tls, &request.dest.host, hops.len(), &deadline).await,
        None => Ok(stream),
    }
}

/// An ordered sequence of one or more [`Proxy`] hops, tunneled through in
/// order to reach a final destination.
#[derive(Clone)]
pub struct ProxyChain {
    chain: ChainSpec,
    resolver: std::sync::Arc<dyn Resolver>,
}

impl std::fmt::Debug for ProxyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyChain").field("chain", &self.chain).finish_non_exhaustive()
    }
}

impl ProxyChain {
    /// Builds a chain from an ordered list of proxies. Errors if `proxies`
    /// is empty.
    pub fn new(proxies: Vec<Proxy>) -> Result<ProxyChain, Error> {
        let descriptors = proxies.into_iter().map(|proxy| proxy.descriptor).collect();
        Ok(ProxyChain {
            chain: ChainSpec::new(descriptors)?,
            resolver: std::sync::Arc::new(TokioResolver),
        })
    }

    /// A chain of exactly one hop; used by [`Proxy::connect`].
    pub fn single(proxy: Proxy) -> ProxyChain {
        ProxyChain {
            chain: ChainSpec::single(proxy.descriptor),
            resolver: std::sync::Arc::new(TokioResolver),
        }
    }

    /// Overrides the resolver consulted for hops where `rdns = False` (or
    /// for non-4a SOCKS4 hops, where local resolution is always required).
    pub fn with_resolver(mut self, resolver: std::sync::Arc<dyn Resolver>) -> ProxyChain {
        self.resolver = resolver;
        self
    }

    /// Connects through every hop in order, then to `dest_host:dest_port`.
    ///
    /// `dest_ssl` wraps the final stream in TLS using [`TlsConfig::default_roots`]
    /// with `dest_host` as SNI; pass a chain built with [`Proxy::with_proxy_tls`]
    /// on individual hops for proxy-side TLS, and use
    /// [`ConnectRequest::with_dest_tls`] directly (via [`Self::connect_with`])
    /// for a custom destination `TlsConfig`.
    pub async fn connect(
        &self,
        dest_host: &str,
        dest_port: u16,
        dest_ssl: bool,
        timeout: Option<Duration>,
    ) -> Result<BoxedStream, Error> {
        let dest = Endpoint::new(HostSpec::parse(dest_host)?, dest_port);
        let mut request = ConnectRequest::new(dest);
        if dest_ssl {
            request = request.with_dest_tls(TlsConfig::default_roots());
        }
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        self.connect_with(request).await
    }

    /// Connects using a fully-built [`ConnectRequest`], for callers that need
    /// a non-default destination `TlsConfig`.
    pub async fn connect_with(&self, request: ConnectRequest) -> Result<BoxedStream, Error> {
        drive(&self.chain, &request, self.resolver.as_ref()).await
    }
}
