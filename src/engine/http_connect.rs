//! HTTP CONNECT engine (RFC 7231 section 4.3.6).

use crate::address::Endpoint;
use crate::credentials::Credentials;
use crate::error::{Error, ProtocolErrorKind};
use crate::timeout::Deadline;
use crate::stream::AsyncReadWrite;
use base64::Engine as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Bounded header buffer; exceeding it without finding `\r\n\r\n` fails
/// with `HeaderTooLong` rather than growing without limit.
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Drives an HTTP CONNECT handshake over `stream`, targeting `dest`.
///
/// Returns any bytes read past the `\r\n\r\n` terminator in the same read
/// call that found it — the first bytes of the tunneled payload, which the
/// connector must prepend to the stream it hands back (see
/// [`crate::stream::Prefixed`]).
pub async fn drive(
    stream: &mut dyn AsyncReadWrite,
    dest: &Endpoint,
    credentials: Option<&Credentials>,
    hop: usize,
    deadline: &Deadline,
) -> Result<Vec<u8>, Error> {
    deadline.guard(hop, handshake(stream, dest, credentials, hop)).await?
}

async fn handshake(
    stream: &mut dyn AsyncReadWrite,
    dest: &Endpoint,
    credentials: Option<&Credentials>,
    hop: usize,
) -> Result<Vec<u8>, Error> {
    let authority = format!("{}:{}", dest.host.display_host(), dest.port);

    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if let Some(creds) = credentials {
        let password = creds.password.as_deref().unwrap_or(&[]);
        let mut token = Vec::with_capacity(creds.username.len() + password.len() + 1);
        token.extend_from_slice(&creds.username);
        token.push(b':');
        token.extend_from_slice(password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(token);
        request.push_str(&format!("Proxy-Authorization: Basic {encoded}\r\n"));
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    let (status, reason, residual) = read_response(stream, hop).await?;

    match status {
        200 => {
            debug!(hop, dest = %dest, "http connect established");
            Ok(residual)
        }
        407 => Err(Error::protocol(hop, ProtocolErrorKind::InvalidAuthCredentials, "proxy authentication required")),
        _ => {
            warn!(hop, status, reason = %reason, "http connect rejected");
            Err(Error::protocol(hop, ProtocolErrorKind::HttpStatus(status, reason.clone()), reason))
        }
    }
}

/// Reads from `stream` until `\r\n\r\n` is found, parses the status line,
/// and returns `(status, reason, bytes read past the terminator)`.
async fn read_response(stream: &mut dyn AsyncReadWrite, hop: usize) -> Result<(u16, String, Vec<u8>), Error> {
    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];

    let header_end = loop {
        if let Some(pos) = find_terminator(&buf) {
            break pos;
        }
        if buf.len() >= MAX_HEADER_BYTES {
            return Err(Error::protocol(hop, ProtocolErrorKind::HeaderTooLong, "response headers exceeded 16KiB"));
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|source| Error::Connection { hop, source })?;
        if n == 0 {
            return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "connection closed before headers completed"));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = &buf[..header_end];
    let residual = buf[header_end + 4..].to_vec();

    let status_line = headers
        .split(|&b| b == b'\n')
        .next()
        .unwrap_or(&[])
        .strip_suffix(b"\r")
        .unwrap_or(headers);
    let status_line = std::str::from_utf8(status_line)
        .map_err(|_| Error::protocol(hop, ProtocolErrorKind::MalformedReply, "status line is not valid UTF-8"))?;

    let mut parts = status_line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| Error::protocol(hop, ProtocolErrorKind::MalformedReply, "missing HTTP version"))?;
    if !version.starts_with("HTTP/1.") {
        return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "not an HTTP/1.x response"));
    }
    let status_token = parts
        .next()
        .ok_or_else(|| Error::protocol(hop, ProtocolErrorKind::MalformedReply, "missing status code"))?;
    if status_token.len() != 3 {
        return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "status code is not 3 digits"));
    }
    let status: u16 = status_token
        .parse()
        .map_err(|_| Error::protocol(hop, ProtocolErrorKind::MalformedReply, "status code is not 3 digits"))?;
    let reason = parts.next().unwrap_or("").to_owned();

    Ok((status, reason, residual))
}

/// Finds `\r\n\r\n`, returning the index of the first `\r`.
fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
