//! Error taxonomy surfaced to callers of the chain driver and handshake
//! engines.

use std::fmt;

/// Per-protocol discriminator carried by [`Error::Protocol`].
///
/// Mirrors the REP/CD tables of SOCKS5 (RFC 1928), SOCKS4, and the status
/// handling of HTTP CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// SOCKS5: server offered only methods the client cannot use (`0xFF`,
    /// or `0x02` without credentials configured).
    NoAcceptableAuthMethod,
    /// SOCKS5: server selected a method byte outside `{0x00, 0x02, 0xFF}`.
    UnsupportedAuthMethod,
    /// SOCKS5 sub-negotiation reply (or HTTP `407`): credentials rejected.
    InvalidAuthCredentials,
    /// SOCKS5 REP 0x01.
    GeneralFailure,
    /// SOCKS5 REP 0x02.
    ConnectionNotAllowed,
    /// SOCKS5 REP 0x03.
    NetworkUnreachable,
    /// SOCKS5 REP 0x04.
    HostUnreachable,
    /// SOCKS5 REP 0x05.
    ConnectionRefused,
    /// SOCKS5 REP 0x06.
    TtlExpired,
    /// SOCKS5 REP 0x07.
    CommandNotSupported,
    /// SOCKS5 REP 0x08.
    AddressTypeNotSupported,
    /// SOCKS4 CD 0x5B.
    Socks4Rejected,
    /// SOCKS4 CD 0x5C.
    Socks4IdentdUnreachable,
    /// SOCKS4 CD 0x5D.
    Socks4IdentdUserMismatch,
    /// HTTP CONNECT response headers exceeded the bounded buffer.
    HeaderTooLong,
    /// HTTP CONNECT non-2xx, non-407 status.
    HttpStatus(u16, String),
    /// A reply/response did not parse as the protocol's wire format at all
    /// (bad version byte, truncated reply, unknown ATYP, ...).
    MalformedReply,
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcceptableAuthMethod => f.write_str("no acceptable authentication method"),
            Self::UnsupportedAuthMethod => f.write_str("server selected an unsupported auth method"),
            Self::InvalidAuthCredentials => f.write_str("credentials rejected"),
            Self::GeneralFailure => f.write_str("general SOCKS server failure"),
            Self::ConnectionNotAllowed => f.write_str("connection not allowed by ruleset"),
            Self::NetworkUnreachable => f.write_str("network unreachable"),
            Self::HostUnreachable => f.write_str("host unreachable"),
            Self::ConnectionRefused => f.write_str("connection refused by destination"),
            Self::TtlExpired => f.write_str("TTL expired"),
            Self::CommandNotSupported => f.write_str("command not supported"),
            Self::AddressTypeNotSupported => f.write_str("address type not supported"),
            Self::Socks4Rejected => f.write_str("request rejected or failed"),
            Self::Socks4IdentdUnreachable => f.write_str("ident service unreachable"),
            Self::Socks4IdentdUserMismatch => f.write_str("ident user id mismatch"),
            Self::HeaderTooLong => f.write_str("response headers exceeded the bounded buffer"),
            Self::HttpStatus(code, reason) => write!(f, "HTTP {} {}", code, reason),
            Self::MalformedReply => f.write_str("malformed reply"),
        }
    }
}

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure reaching a proxy: TCP connect refused or
    /// unreachable, or a TLS handshake to the proxy itself failed.
    #[error("hop {hop}: connection error: {source}")]
    Connection {
        hop: usize,
        #[source]
        source: std::io::Error,
    },

    /// The deadline for the whole chained connect expired while this hop
    /// was in flight.
    #[error("hop {hop}: timed out")]
    Timeout { hop: usize },

    /// A protocol-level failure: malformed reply, unsupported method,
    /// authentication rejected, a non-success reply code, or an HTTP
    /// non-2xx status.
    #[error("hop {hop}: {kind}: {message}")]
    Protocol {
        hop: usize,
        kind: ProtocolErrorKind,
        message: String,
    },

    /// Local resolution of `host` returned no addresses or failed outright.
    #[error("resolving {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// A `ProxyDescriptor`, `ChainSpec`, or URL could not be constructed:
    /// an empty chain, an out-of-range credential field, a domain over 255
    /// bytes, or a URL parse failure. Raised before any I/O is attempted.
    #[error("invalid proxy descriptor: {0}")]
    InvalidDescriptor(String),
}

impl Error {
    pub(crate) fn protocol(hop: usize, kind: ProtocolErrorKind, message: impl Into<String>) -> Error {
        Error::Protocol {
            hop,
            kind,
            message: message.into(),
        }
    }

    /// The hop index this error occurred at, when applicable.
    pub fn hop(&self) -> Option<usize> {
        match self {
            Error::Connection { hop, .. } => Some(*hop),
            Error::Timeout { hop } => Some(*hop),
            Error::Protocol { hop, .. } => Some(*hop),
            Error::Resolve { .. } | Error::InvalidDescriptor(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
