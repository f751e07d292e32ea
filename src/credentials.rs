//! Optional username/password carried by a proxy descriptor.
//!
//! SOCKS5 (RFC 1929) and HTTP Basic auth carry both a username and a
//! password; SOCKS4 has no password field at all and only ever sends a
//! USERID (the `ident`). `password` is therefore optional on this type: a
//! SOCKS4 hop with a bare ident is built via [`Credentials::ident`], while
//! SOCKS5/HTTP hops use [`Credentials::new`].

use crate::error::Error;

/// A username, and (except for a SOCKS4 ident) a password. Each present
/// field must be 1..=255 octets (the SOCKS5 RFC 1929 sub-negotiation
/// reserves a single length octet for each).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Vec<u8>,
    pub password: Option<Vec<u8>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// A username/password pair, for SOCKS5 RFC 1929 sub-negotiation and
    /// HTTP `Proxy-Authorization: Basic`.
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Result<Credentials, Error> {
        let username = username.into();
        let password = password.into();
        validate_field_len("username", &username)?;
        validate_field_len("password", &password)?;
        Ok(Credentials {
            username,
            password: Some(password),
        })
    }

    /// A bare SOCKS4 USERID with no password: `SOCKS4Proxy(host, port,
    /// user_id)` in the systems this crate is modeled on has no password
    /// parameter at all.
    pub fn ident(username: impl Into<Vec<u8>>) -> Result<Credentials, Error> {
        let username = username.into();
        validate_field_len("username", &username)?;
        Ok(Credentials {
            username,
            password: None,
        })
    }
}

fn validate_field_len(field: &str, bytes: &[u8]) -> Result<(), Error> {
    if !(1..=255).contains(&bytes.len()) {
        return Err(Error::InvalidDescriptor(format!(
            "{field} length {} out of range 1..=255",
            bytes.len()
        )));
    }
    Ok(())
}
