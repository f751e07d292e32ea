//! SOCKS4 / SOCKS4a engine: `Request -> ReplyParsed -> Established`.

use super::CMD_CONNECT;
use crate::address::{Endpoint, HostSpec};
use crate::credentials::Credentials;
use crate::error::{Error, ProtocolErrorKind};
use crate::resolver::{FamilyPreference, Resolver};
use crate::stream::AsyncReadWrite;
use crate::timeout::Deadline;
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

const VERSION: u8 = 0x04;
const REPLY_VERSION: u8 = 0x00;

/// `0.0.0.x`, `x != 0`: the invalid, non-zero IPv4 address that signals a
/// SOCKS4a server to expect a trailing hostname.
const SOCKS4A_SENTINEL: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

fn map_reply_code(cd: u8) -> Option<ProtocolErrorKind> {
    match cd {
        0x5A => None,
        0x5B => Some(ProtocolErrorKind::Socks4Rejected),
        0x5C => Some(ProtocolErrorKind::Socks4IdentdUnreachable),
        0x5D => Some(ProtocolErrorKind::Socks4IdentdUserMismatch),
        _ => Some(ProtocolErrorKind::MalformedReply),
    }
}

/// Drives a SOCKS4/4a handshake over `stream`, targeting `dest`.
///
/// `forwards_domain_verbatim` selects the 4a extension: when true and
/// `dest.host` is a domain, the request carries the `0.0.0.1` sentinel
/// address and a trailing null-terminated hostname instead of resolving
/// locally. When false, `resolver` must yield an IPv4 address (an IPv6
/// destination is rejected here.
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
    let ident = credentials.map(|c| c.username.as_slice()).unwrap_or(&[]);

    let (ip, domain_suffix): (Ipv4Addr, Option<&str>) = match &dest.host {
        HostSpec::V4(addr) => (*addr, None),
        HostSpec::V6(_) => {
            return Err(Error::InvalidDescriptor(
                "SOCKS4 cannot carry an IPv6 destination".into(),
            ));
        }
        HostSpec::Domain(name) => {
            if forwards_domain_verbatim {
                (SOCKS4A_SENTINEL, Some(name.as_str()))
            } else {
                let resolved = resolver.resolve(name, FamilyPreference::Ipv4).await?;
                match resolved {
                    std::net::IpAddr::V4(v4) => (v4, None),
                    std::net::IpAddr::V6(_) => {
                        return Err(Error::InvalidDescriptor(
                            "rdns=False SOCKS4 hop requires an IPv4-resolvable destination".into(),
                        ));
                    }
                }
            }
        }
    };

    let mut buf = Vec::with_capacity(9 + ident.len() + domain_suffix.map(str::len).unwrap_or(0));
    buf.push(VERSION);
    buf.push(CMD_CONNECT);
    crate::address::encode_port(&mut buf, dest.port);
    buf.extend_from_slice(&ip.octets());
    buf.extend_from_slice(ident);
    buf.push(0x00);
    if let Some(name) = domain_suffix {
        buf.extend_from_slice(name.as_bytes());
        buf.push(0x00);
    }

    stream
        .write_all(&buf)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    let mut reply = [0u8; 8];
    stream
        .read_exact(&mut reply)
        .await
        .map_err(|source| Error::Connection { hop, source })?;

    if reply[0] != REPLY_VERSION {
        return Err(Error::protocol(hop, ProtocolErrorKind::MalformedReply, "bad reply version byte"));
    }
    if let Some(kind) = map_reply_code(reply[1]) {
        return Err(Error::protocol(hop, kind.clone(), kind.to_string()));
    }

    debug!(hop, dest = %dest, "socks4 handshake established");
    Ok(Vec::new())
}
