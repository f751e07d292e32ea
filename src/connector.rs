//! Drives a single hop: opens (or reuses) a transport, wraps it in TLS if
//! the hop calls for it, and runs the matching handshake engine.

use crate::address::Endpoint;
use crate::descriptor::ProxyDescriptor;
use crate::engine::{http_connect, socks4, socks5};
use crate::error::Error;
use crate::kind::ProxyKind;
use crate::resolver::Resolver;
use crate::stream::{box_stream, BoxedStream, Prefixed};
use crate::timeout::Deadline;
use crate::tls;
use tokio::net::TcpStream;
use tracing::trace;

/// Establishes `descriptor`'s hop, handshaking towards `next_hop` (the next
/// proxy's endpoint, or the caller's ultimate destination on the last hop).
///
/// `existing_stream` is `None` only for the first hop; every later hop
/// tunnels through the stream the previous hop produced.
pub async fn connect(
    descriptor: &ProxyDescriptor,
    next_hop: &Endpoint,
    existing_stream: Option<BoxedStream>,
    resolver: &dyn Resolver,
    hop: usize,
    deadline: &Deadline,
) -> Result<BoxedStream, Error> {
    let mut stream = match existing_stream {
        Some(stream) => stream,
        None => {
            trace!(hop, endpoint = %descriptor.endpoint, "opening transport");
            let tcp = deadline
                .guard(hop, TcpStream::connect(descriptor.endpoint.authority()))
                .await?
                .map_err(|source| Error::Connection { hop, source })?;
            box_stream(tcp)
        }
    };

    if let Some(proxy_tls) = &descriptor.proxy_tls {
        stream = tls::wrap_tls(stream, proxy_tls, &descriptor.endpoint.host, hop, deadline).await?;
    }

    let forwards_domain_verbatim = descriptor.forwards_domain_verbatim();

    let residual = match descriptor.kind {
        ProxyKind::Socks5 => {
            socks5::drive(
                &mut *stream,
                next_hop,
                descriptor.credentials.as_ref(),
                forwards_domain_verbatim,
                resolver,
                hop,
                deadline,
            )
            .await?
        }
        ProxyKind::Socks4 => {
            socks4::drive(
                &mut *stream,
                next_hop,
                descriptor.credentials.as_ref(),
                forwards_domain_verbatim,
                resolver,
                hop,
                deadline,
            )
            .await?
        }
        ProxyKind::Http => {
            http_connect::drive(&mut *stream, next_hop, descriptor.credentials.as_ref(), hop, deadline).await?
        }
    };

    if residual.is_empty() {
        Ok(stream)
    } else {
        Ok(box_stream(Prefixed::new(residual, stream)))
    }
}
