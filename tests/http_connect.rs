mod common;

use common::{spawn_echo_server, spawn_http_connect_fixture};
use proxy_tunnel::{Proxy, ProxyKind};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn connect_succeeds_and_tunnels_payload() {
    let echo_addr = spawn_echo_server().await;
    let proxy_addr = spawn_http_connect_fixture(Some(echo_addr), 200).await;

    let proxy = Proxy::create(ProxyKind::Http, "127.0.0.1", proxy_addr.port(), None, None, None).unwrap();
    let mut stream = proxy
        .connect("127.0.0.1", echo_addr.port(), false, Some(Duration::from_secs(5)))
        .await
        .expect("CONNECT should succeed");

    stream.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");
}

#[tokio::test]
async fn non_2xx_status_is_surfaced_as_http_status_error() {
    let proxy_addr = spawn_http_connect_fixture(None, 403).await;

    let proxy = Proxy::create(ProxyKind::Http, "127.0.0.1", proxy_addr.port(), None, None, None).unwrap();
    let err = proxy
        .connect("example.test", 80, false, Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    match err {
        proxy_tunnel::Error::Protocol { kind: proxy_tunnel::ProtocolErrorKind::HttpStatus(code, _), .. } => {
            assert_eq!(code, 403);
        }
        other => panic!("expected HttpStatus(403, _), got {other:?}"),
    }
}

#[tokio::test]
async fn proxy_authentication_required_maps_to_invalid_credentials() {
    let proxy_addr = spawn_http_connect_fixture(None, 407).await;

    let proxy = Proxy::create(ProxyKind::Http, "127.0.0.1", proxy_addr.port(), Some("u"), Some("p"), None).unwrap();
    let err = proxy
        .connect("example.test", 80, false, Some(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        proxy_tunnel::Error::Protocol {
            kind: proxy_tunnel::ProtocolErrorKind::InvalidAuthCredentials,
            ..
        }
    ));
}
