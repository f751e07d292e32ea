//! Byte-level serialization of proxy destinations.
//!
//! Covers the SOCKS5 ATYP encoding (IPv4 / domain / IPv6) used on the wire
//! for both the request and the symmetric reply form, plus the plain
//! 4-octet-IPv4 encoding SOCKS4 uses.

use crate::error::{Error, ProtocolErrorKind};
use byteorder::{BigEndian, ByteOrder};
use std::net::{Ipv4Addr, Ipv6Addr};

/// The maximum length of a domain name carried in a SOCKS5 request: the
/// wire format reserves a single octet for the length.
pub const MAX_DOMAIN_LEN: usize = 255;

/// A destination host, in whichever form the caller or a previous hop
/// already knows it as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSpec {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    /// UTF-8 bytes, 1..=255 octets, no trailing NUL.
    Domain(String),
}

impl HostSpec {
    /// An IP-literal host returned unchanged; a non-literal string is
    /// carried as a domain name.
    ///
    /// Mirrors the "IP-literal input is returned unchanged without system
    /// lookups" rule from the resolver contract: anything that parses as
    /// an IP address never goes near [`crate::resolver::Resolver`].
    pub fn parse(host: &str) -> Result<HostSpec, Error> {
        if let Ok(v4) = host.parse::<Ipv4Addr>() {
            return Ok(HostSpec::V4(v4));
        }
        if let Ok(v6) = host.parse::<Ipv6Addr>() {
            return Ok(HostSpec::V6(v6));
        }
        // Bracketed IPv6 literal, e.g. from a parsed URL's host.
        if host.starts_with('[') && host.ends_with(']') && host.len() > 2 {
            if let Ok(v6) = host[1..host.len() - 1].parse::<Ipv6Addr>() {
                return Ok(HostSpec::V6(v6));
            }
        }
        if host.is_empty() || host.len() > MAX_DOMAIN_LEN {
            return Err(Error::InvalidDescriptor(format!(
                "domain name length {} out of range 1..=255",
                host.len()
            )));
        }
        Ok(HostSpec::Domain(host.to_owned()))
    }

    pub fn is_ip_literal(&self) -> bool {
        !matches!(self, HostSpec::Domain(_))
    }

    /// The string form used as the `<host>` token in an HTTP CONNECT
    /// request line, and as TLS SNI: domains as-is, IPv6 wrapped in
    /// brackets.
    pub fn display_host(&self) -> String {
        match self {
            HostSpec::V4(addr) => addr.to_string(),
            HostSpec::V6(addr) => format!("[{}]", addr),
            HostSpec::Domain(name) => name.clone(),
        }
    }
}

impl From<std::net::IpAddr> for HostSpec {
    fn from(ip: std::net::IpAddr) -> HostSpec {
        match ip {
            std::net::IpAddr::V4(v4) => HostSpec::V4(v4),
            std::net::IpAddr::V6(v6) => HostSpec::V6(v6),
        }
    }
}

impl std::fmt::Display for HostSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_host())
    }
}

/// `{host, port}` pair identifying either a proxy or the final destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: HostSpec,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: HostSpec, port: u16) -> Endpoint {
        Endpoint { host, port }
    }

    /// A `host:port` string suitable for `tokio::net::TcpStream::connect`.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host.display_host(), self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// SOCKS5 ATYP byte values (RFC 1928 section 5).
mod atyp {
    pub const IPV4: u8 = 0x01;
    pub const DOMAIN: u8 = 0x03;
    pub const IPV6: u8 = 0x04;
}

/// Appends the SOCKS5 wire encoding of `host` (ATYP + address payload) to
/// `buf`. Does not write the port.
pub fn encode_socks5_address(buf: &mut Vec<u8>, host: &HostSpec) -> Result<(), Error> {
    match host {
        HostSpec::V4(addr) => {
            buf.push(atyp::IPV4);
            buf.extend_from_slice(&addr.octets());
        }
        HostSpec::V6(addr) => {
            buf.push(atyp::IPV6);
            buf.extend_from_slice(&addr.octets());
        }
        HostSpec::Domain(name) => {
            if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
                return Err(Error::InvalidDescriptor(format!(
                    "domain name length {} out of range 1..=255",
                    name.len()
                )));
            }
            buf.push(atyp::DOMAIN);
            buf.push(name.len() as u8);
            buf.extend_from_slice(name.as_bytes());
        }
    }
    Ok(())
}

/// Appends a big-endian port to `buf`.
pub fn encode_port(buf: &mut Vec<u8>, port: u16) {
    let mut tmp = [0u8; 2];
    BigEndian::write_u16(&mut tmp, port);
    buf.extend_from_slice(&tmp);
}

/// Decodes a SOCKS5 address (ATYP + payload, no port) from the front of
/// `buf`, returning the parsed host and the number of bytes consumed.
///
/// Used to parse the `BND.ADDR` field of a SOCKS5 reply; the caller has
/// already read a fixed prefix and must keep reading until this function's
/// declared length is satisfied (see [`socks5_reply_len_hint`]).
pub fn decode_socks5_address(buf: &[u8]) -> Result<(HostSpec, usize), ProtocolErrorKind> {
    if buf.is_empty() {
        return Err(ProtocolErrorKind::MalformedReply);
    }
    match buf[0] {
        atyp::IPV4 => {
            if buf.len() < 5 {
                return Err(ProtocolErrorKind::MalformedReply);
            }
            let octets = [buf[1], buf[2], buf[3], buf[4]];
            Ok((HostSpec::V4(Ipv4Addr::from(octets)), 5))
        }
        atyp::IPV6 => {
            if buf.len() < 17 {
                return Err(ProtocolErrorKind::MalformedReply);
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[1..17]);
            Ok((HostSpec::V6(Ipv6Addr::from(octets)), 17))
        }
        atyp::DOMAIN => {
            if buf.len() < 2 {
                return Err(ProtocolErrorKind::MalformedReply);
            }
            let len = buf[1] as usize;
            if len == 0 {
                return Err(ProtocolErrorKind::MalformedReply);
            }
            if buf.len() < 2 + len {
                return Err(ProtocolErrorKind::MalformedReply);
            }
            let name = String::from_utf8_lossy(&buf[2..2 + len]).into_owned();
            Ok((HostSpec::Domain(name), 2 + len))
        }
        _ => Err(ProtocolErrorKind::AddressTypeNotSupported),
    }
}

/// How many bytes the address payload occupies, given only the leading
/// ATYP byte; `None` for domains, since their length depends on a second
/// byte not yet read.
pub fn socks5_address_len_for_atyp(atyp_byte: u8) -> Option<usize> {
    match atyp_byte {
        atyp::IPV4 => Some(4),
        atyp::IPV6 => Some(16),
        _ => None,
    }
}

pub(crate) const ATYP_DOMAIN: u8 = atyp::DOMAIN;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ipv4() {
        let host = HostSpec::V4(Ipv4Addr::new(192, 0, 2, 1));
        let mut buf = Vec::new();
        encode_socks5_address(&mut buf, &host).unwrap();
        let (decoded, used) = decode_socks5_address(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(decoded, host);
    }

    #[test]
    fn round_trips_ipv6() {
        let host = HostSpec::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let mut buf = Vec::new();
        encode_socks5_address(&mut buf, &host).unwrap();
        let (decoded, used) = decode_socks5_address(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(decoded, host);
    }

    #[test]
    fn round_trips_domain() {
        let host = HostSpec::Domain("example.test".to_owned());
        let mut buf = Vec::new();
        encode_socks5_address(&mut buf, &host).unwrap();
        let (decoded, used) = decode_socks5_address(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(decoded, host);
    }

    #[test]
    fn rejects_empty_domain() {
        let host = HostSpec::Domain(String::new());
        let mut buf = Vec::new();
        assert!(encode_socks5_address(&mut buf, &host).is_err());
    }

    #[test]
    fn rejects_unknown_atyp() {
        let buf = [0x7f, 0, 0, 0, 0];
        assert!(decode_socks5_address(&buf).is_err());
    }

    #[test]
    fn parses_ip_literal_without_domain_fallback() {
        assert_eq!(
            HostSpec::parse("192.0.2.7").unwrap(),
            HostSpec::V4(Ipv4Addr::new(192, 0, 2, 7))
        );
        assert_eq!(
            HostSpec::parse("::1").unwrap(),
            HostSpec::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
        assert!(matches!(HostSpec::parse("example.test"), Ok(HostSpec::Domain(_))));
    }
}
