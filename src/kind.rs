//! The proxy protocol tag and the rdns tri-state policy.

/// Which handshake engine a [`crate::descriptor::ProxyDescriptor`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Socks5,
    Socks4,
    Http,
}

impl ProxyKind {
    /// The scheme's default port when a URL omits one.
    pub fn default_port(self) -> u16 {
        match self {
            ProxyKind::Socks5 | ProxyKind::Socks4 => 1080,
            ProxyKind::Http => 80,
        }
    }
}

/// The `rdns` tri-state: whether a domain destination is resolved locally
/// or forwarded to the proxy for remote resolution.
///
/// `None` defers to the per-protocol default: `True` for SOCKS5, `True`
/// (use the 4a extension) for SOCKS4, irrelevant for HTTP CONNECT (the
/// proxy always receives the hostname as text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rdns {
    None,
    True,
    False,
}

impl Rdns {
    /// Resolves the tri-state against `kind`'s default. Returns `true` when
    /// a domain destination should be forwarded to the proxy verbatim
    /// (remote resolution), `false` when the driver must resolve it
    /// locally before building the request.
    ///
    /// HTTP CONNECT always sends the hostname as text in the request
    /// line regardless of this flag, so it is treated as always remote.
    pub fn forwards_domain_verbatim(self, kind: ProxyKind) -> bool {
        match (self, kind) {
            (_, ProxyKind::Http) => true,
            (Rdns::False, _) => false,
            (Rdns::True, _) | (Rdns::None, _) => true,
        }
    }
}

impl Default for Rdns {
    fn default() -> Rdns {
        Rdns::None
    }
}
