//! SOCKS5 engine: `Greet -> MethodSelected -> {AuthUserPass -> AuthDone}? ->
//! Request -> ReplyParsed -> Established` (RFC 1928 + RFC 1929).

use super::CMD_CONNECT;
use crate::address::{self, HostSpec};
use crate::credentials::Credentials;
use crate::error::{Error, ProtocolErrorKind};
use crate::resolver::{FamilyPreference, Resolver};
use crate::stream::AsyncReadWrite;
use crate::timeout::Deadline;
use address::Endpoint;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace, warn};

const VERSION: u8 = 0x05;

const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_USER_PASS: u8 = 0x02;
const METHOD_NO_ACCEPTABLE: u8 = 0xFF;

const RSV: u8 = 0x00;

fn map_reply_code(rep: u8) -> Option<ProtocolErrorKind> {
    match rep {
        0x00 => None,
        0x01 => Some(ProtocolErrorKind::GeneralFailure),
        0x02 => Some(ProtocolErrorKind::ConnectionNotAllowed),
        0x03 => Some(ProtocolErrorKind::NetworkUnreachable),
        0x04 => Some(ProtocolErrorKind::HostUnreachable),
        0x05 => Some(ProtocolErrorKind::ConnectionRefused),
        0x06 => Some(ProtocolErrorKind::TtlExpired),
        0x07 => Some(ProtocolErrorKind::CommandNotSupported),
        0x08 => Some(ProtocolErrorKind::AddressTypeNotSupported),
        _ => Some(ProtocolErrorKind::MalformedReply),
    }
}

/// Drives a full SOCKS5 handshake over `stream`, targeting `dest`.
///
/// `forwards_domain_verbatim` comes from [`crate::descriptor::ProxyDescriptor::forwards_domain_verbatim`];
/// when false and `dest.host` is a domain, `resolver` is consulted first
/// so the request always carries a literal address.
pub async fn drive(
    stream: &mut dyn AsyncReadWrite,
    dest: &Endpoint,
    credentials: Option<&Credentials>,
    forwards_domain_verbatim: bool,
    resolver: &dyn Resolver,
    hop: usize,
    deadline: &Deadline,
) -> Result<Vec<u8>, Error> {
    deadline
        .guard(hop, handshake(stream, dest, credentials, forwards_domain_verbatim, resolver, hop))
        .await?
}

async fn handshake(
    stream: &mut dyn AsyncReadWrite,
    dest: &Endpoint,
    credentials: Option<&Credentials>,
    forwards_domain_verbatim: bool,
    resolver: &dyn Resolver,
    hop: usize,
) -> Result<Vec<u8>, Error> {
    greet(stream, credentials.is_some(), hop).await?;
    let method = read_method_selection(stream, hop).await?;

    match method {
        METHOD_NO_AUTH => {}
        METHOD_USER_PASS => {
            let creds = credentials.ok_or_else(|| {
                Error::protocol(hop, ProtocolErrorKind::NoAcceptableAuthMethod, "server requires credentials we don't have")
            })?;
            authenticate(stream, creds, hop).await?;
        }
        METHOD_NO_ACCEPTABLE => {
            return Err(Error::protocol(hop, ProtocolErrorKind::NoAcceptableAuthMethod, "server accepted no offered method"));
        }
        other => {
            return Err(Error::protocol(
                hop,
                ProtocolErrorKind::UnsupportedAuthMethod,
                format!("server selected unknown method 0x{:02x}", other),
            ));
        }
    }

    let resolved_host = if !forwards_domain_verbatim {
        if let HostSpec::Domain(name) = &dest.host {
            let ip = resolver.resolve(name, FamilyPreference::Either).await?;
            Some(HostSpec::from(ip))
        } else {
            None
        }
    } else {
        None
    };
    let request_host = resolved_host.as_ref().unwrap_or(&dest.host);

    send_request(stream, request_host, dest.port, hop).await?;
    read_reply(stream, hop).await?;

    debug!(hop, dest = %dest, "socks5 handshake established");
    Ok(Vec::new())
}

async fn greet(stream: &mut dyn AsyncReadWrite, has_credentials: bool, hop: usize) -> Result<(), Error> {
    let methods: &[u8] = if has_credentials {
        &[METHOD_NO_AUTH, METHOD_USER_PASS]
    } else {
        &[METHOD_NO_AUTH]
    };

    let mut buf = Vec::with_capacity(2 + methods.len());
    buf.push(VERSION);
    buf.push(methods.len() as u8);
    buf.extend_from_slice(methods);

    trace!(hop, "socks5 greet");
    stream
        .write_all(&buf)
        .await
        .map_err(|source| Error::Connection { hop, source })
}

async fn read_method_selection(stream: &mut dyn AsyncReadWrite, hop: usize) -> Result<u8, Error> {
    let mut reply = [0u8; 2];
    stream
        .read_exact(&mut reply)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    if reply[0] != VERSION {
        return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "bad SOCKS version in method reply"));
    }
    Ok(reply[1])
}

async fn authenticate(stream: &mut dyn AsyncReadWrite, creds: &Credentials, hop: usize) -> Result<(), Error> {
    // A SOCKS4-style ident has no password; RFC 1929 still requires a PLEN
    // octet, so a missing password is sent as the empty string rather than
    // rejected here.
    let password = creds.password.as_deref().unwrap_or(&[]);

    let mut buf = Vec::with_capacity(3 + creds.username.len() + password.len());
    buf.push(0x01); // sub-negotiation version
    buf.push(creds.username.len() as u8);
    buf.extend_from_slice(&creds.username);
    buf.push(password.len() as u8);
    buf.extend_from_slice(password);

    stream
        .write_all(&buf)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    let mut reply = [0u8; 2];
    stream
        .read_exact(&mut reply)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    // The VER byte of the sub-negotiation reply is read permissively and
    // ignored; only the status byte gates success.
    if reply[1] != 0x00 {
        warn!(hop, "socks5 user/pass auth rejected");
        return Err(Error::protocol(hop, ProtocolErrorKind::InvalidAuthCredentials, "auth rejected"));
    }
    Ok(())
}

async fn send_request(stream: &mut dyn AsyncReadWrite, host: &HostSpec, port: u16, hop: usize) -> Result<(), Error> {
    let mut buf = Vec::with_capacity(10);
    buf.push(VERSION);
    buf.push(CMD_CONNECT);
    buf.push(RSV);
    address::encode_socks5_address(&mut buf, host)?;
    address::encode_port(&mut buf, port);

    stream
        .write_all(&buf)
        .await
        .map_err(|source| Error::Connection { hop, source })
}

async fn read_reply(stream: &mut dyn AsyncReadWrite, hop: usize) -> Result<(), Error> {
    let mut head = [0u8; 4];
    stream
        .read_exact(&mut head)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    if head[0] != VERSION {
        return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "bad SOCKS version in reply"));
    }
    let rep = head[1];
    let atyp = head[3];

    let addr_len = match address::socks5_address_len_for_atyp(atyp) {
        Some(len) => len,
        None if atyp == address::ATYP_DOMAIN => {
            let mut len_byte = [0u8; 1];
            stream
                .read_exact(&mut len_byte)
                .await
                .map_err(|source| Error::Connection { hop, source })?;
            len_byte[0] as usize
        }
        None => {
            return Err(Error::protocol(hop, ProtocolErrorKind::AddressTypeNotSupported, "unknown ATYP in reply"));
        }
    };

    let mut addr_and_port = vec![0u8; addr_len + 2];
    stream
        .read_exact(&mut addr_and_port)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    if let Some(kind) = map_reply_code(rep) {
        return Err(Error::protocol(hop, kind.clone(), kind.to_string()));
    }
    Ok(())
}
