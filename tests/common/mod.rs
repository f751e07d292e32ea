//! Minimal, real (not mocked) proxy fixture servers used by the integration
//! tests: each accepts exactly one connection, speaks just enough of its
//! protocol to establish a tunnel, then relays bytes to the address the
//! client asked for.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Spawns a `tokio::net::TcpListener` on an OS-assigned loopback port and
/// returns its address before any connection is accepted.
async fn bind_loopback() -> (SocketAddr, TcpListener) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, listener)
}

/// A trivial TCP server that, once connected to, echoes back whatever it
/// receives. Stands in for "the thing behind the proxy" in every scenario.
pub async fn spawn_echo_server() -> SocketAddr {
    let (addr, listener) = bind_loopback().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
    addr
}

pub struct Socks5FixtureOptions {
    pub require_credentials: Option<(Vec<u8>, Vec<u8>)>,
    pub slow_method_reply: Option<Duration>,
    pub relay_to: Option<SocketAddr>,
}

impl Default for Socks5FixtureOptions {
    fn default() -> Self {
        Socks5FixtureOptions {
            require_credentials: None,
            slow_method_reply: None,
            relay_to: None,
        }
    }
}

/// The last SOCKS5 request this fixture received, for wire-capture assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub atyp: u8,
    pub address_bytes: Vec<u8>,
}

/// Spawns a minimal SOCKS5 server. On success it relays the tunnel to
/// `relay_to` if set, otherwise it just echoes.
pub async fn spawn_socks5_fixture(
    options: Socks5FixtureOptions,
) -> (SocketAddr, tokio::sync::oneshot::Receiver<CapturedRequest>) {
    let (addr, listener) = bind_loopback().await;
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut greet = [0u8; 2];
        if stream.read_exact(&mut greet).await.is_err() {
            return;
        }
        let nmethods = greet[1] as usize;
        let mut methods = vec![0u8; nmethods];
        if stream.read_exact(&mut methods).await.is_err() {
            return;
        }

        if let Some(delay) = options.slow_method_reply {
            tokio::time::sleep(delay).await;
        }

        let selected = if options.require_credentials.is_some() && methods.contains(&0x02) {
            0x02u8
        } else {
            0x00u8
        };
        if stream.write_all(&[0x05, selected]).await.is_err() {
            return;
        }

        if selected == 0x02 {
            let mut head = [0u8; 2];
            if stream.read_exact(&mut head).await.is_err() {
                return;
            }
            let ulen = head[1] as usize;
            let mut uname = vec![0u8; ulen];
            stream.read_exact(&mut uname).await.unwrap();
            let mut plen_buf = [0u8; 1];
            stream.read_exact(&mut plen_buf).await.unwrap();
            let plen = plen_buf[0] as usize;
            let mut pass = vec![0u8; plen];
            stream.read_exact(&mut pass).await.unwrap();

            let (expected_user, expected_pass) = options.require_credentials.clone().unwrap();
            let ok = uname == expected_user && pass == expected_pass;
            stream.write_all(&[0x01, if ok { 0x00 } else { 0x01 }]).await.unwrap();
            if !ok {
                return;
            }
        }

        let mut req_head = [0u8; 4];
        if stream.read_exact(&mut req_head).await.is_err() {
            return;
        }
        let atyp = req_head[3];
        let address_bytes = match atyp {
            0x01 => {
                let mut b = [0u8; 4];
                stream.read_exact(&mut b).await.unwrap();
                b.to_vec()
            }
            0x04 => {
                let mut b = [0u8; 16];
                stream.read_exact(&mut b).await.unwrap();
                b.to_vec()
            }
            0x03 => {
                let mut len_byte = [0u8; 1];
                stream.read_exact(&mut len_byte).await.unwrap();
                let mut b = vec![0u8; len_byte[0] as usize];
                stream.read_exact(&mut b).await.unwrap();
                b
            }
            _ => Vec::new(),
        };
        let mut port = [0u8; 2];
        stream.read_exact(&mut port).await.unwrap();

        let _ = tx.send(CapturedRequest { atyp, address_bytes });

        let reply = [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        if stream.write_all(&reply).await.is_err() {
            return;
        }

        relay_or_echo(stream, options.relay_to).await;
    });

    (addr, rx)
}

/// Spawns a minimal SOCKS4/4a server accepting any request and relaying (or
/// echoing) past the reply.
pub async fn spawn_socks4_fixture(relay_to: Option<SocketAddr>) -> SocketAddr {
    let (addr, listener) = bind_loopback().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut head = [0u8; 8];
        if stream.read_exact(&mut head).await.is_err() {
            return;
        }
        // USERID, NUL-terminated.
        loop {
            let mut b = [0u8; 1];
            if stream.read_exact(&mut b).await.is_err() {
                return;
            }
            if b[0] == 0 {
                break;
            }
        }
        // 4a: 0.0.0.x sentinel means a trailing hostname follows.
        if head[4..8] == [0, 0, 0, 1] {
            loop {
                let mut b = [0u8; 1];
                if stream.read_exact(&mut b).await.is_err() {
                    return;
                }
                if b[0] == 0 {
                    break;
                }
            }
        }

        let reply = [0x00, 0x5A, 0, 0, 0, 0, 0, 0];
        if stream.write_all(&reply).await.is_err() {
            return;
        }

        relay_or_echo(stream, relay_to).await;
    });
    addr
}

/// Spawns a minimal HTTP CONNECT proxy, optionally rejecting with `status`.
pub async fn spawn_http_connect_fixture(relay_to: Option<SocketAddr>, status: u16) -> SocketAddr {
    let (addr, listener) = bind_loopback().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = match status {
            200 => b"HTTP/1.1 200 Connection established\r\n\r\n".to_vec(),
            407 => b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n".to_vec(),
            _ => format!("HTTP/1.1 {status} Rejected\r\n\r\n").into_bytes(),
        };
        if stream.write_all(&response).await.is_err() {
            return;
        }
        if status != 200 {
            return;
        }

        relay_or_echo(stream, relay_to).await;
    });
    addr
}

async fn relay_or_echo(mut stream: TcpStream, relay_to: Option<SocketAddr>) {
    match relay_to {
        Some(target) => {
            if let Ok(mut upstream) = TcpStream::connect(target).await {
                let _ = tokio::io::copy_bidirectional(&mut stream, &mut upstream).await;
            }
        }
        None => {
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if stream.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
