//! Proxy-side and destination-side TLS establishment.
//!
//! Both uses in this crate (TLS to the first proxy, and TLS tunneled
//! through the last proxy to the final destination) share the same
//! `rustls::ClientConfig` and the same `tokio_rustls::TlsConnector`; only
//! the SNI and the stream being wrapped differ.

use crate::address::HostSpec;
use crate::error::Error;
use crate::stream::{box_stream, AsyncReadWrite, BoxedStream};
use crate::timeout::Deadline;
use std::sync::Arc;
use tokio_rustls::rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;

/// TLS material for wrapping a transport. Wraps an `Arc<ClientConfig>` so
/// it is cheap to clone and share across a `ChainSpec`.
#[derive(Clone)]
pub struct TlsConfig {
    config: Arc<ClientConfig>,
}

impl TlsConfig {
    pub fn new(config: ClientConfig) -> TlsConfig {
        TlsConfig {
            config: Arc::new(config),
        }
    }

    pub fn from_arc(config: Arc<ClientConfig>) -> TlsConfig {
        TlsConfig { config }
    }

    /// A `ClientConfig` trusting the bundled Mozilla root store
    /// (`webpki-roots`), with no client certificate. The common case for
    /// both `https://` proxies and TLS-fronted destinations.
    pub fn default_roots() -> TlsConfig {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        TlsConfig::new(config)
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig").finish_non_exhaustive()
    }
}

/// Wraps `stream` in TLS using `sni` as the server name, boxing the result.
///
/// `sni` is only meaningful for domain hosts; an IP-literal destination
/// (`dest_tls` wraps "using `dest.host` as SNI ... unless `dest.host`
/// is an IP literal") should not reach this function at all when it isn't
/// a domain — callers check [`HostSpec::is_ip_literal`] first and skip SNI
/// based wrapping, or pass an explicit name.
///
/// The handshake itself is run under `deadline`, same as every other
/// suspension point in a hop: a TLS handshake that never completes must
/// still trip the timeout and drop the underlying TCP socket rather than
/// leak it.
pub async fn wrap_tls<S>(
    stream: S,
    tls: &TlsConfig,
    sni: &HostSpec,
    hop: usize,
    deadline: &Deadline,
) -> Result<BoxedStream, Error>
where
    S: AsyncReadWrite + 'static,
{
    let server_name = server_name_for(sni, hop)?;
    let connector = TlsConnector::from(tls.config.clone());
    let tls_stream = deadline
        .guard(hop, connector.connect(server_name, stream))
        .await?
        .map_err(|source| Error::Connection { hop, source })?;
    Ok(box_stream(tls_stream))
}

fn server_name_for(host: &HostSpec, hop: usize) -> Result<ServerName, Error> {
    let text = host.display_host();
    ServerName::try_from(text.as_str()).map_err(|_| {
        Error::InvalidDescriptor(format!("hop {}: '{}' is not a valid TLS server name", hop, text))
    })
}
