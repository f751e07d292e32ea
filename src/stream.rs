//! The stream abstraction: any tokio-compatible bidirectional byte
//! stream is a valid transport for a handshake engine. The chain driver
//! boxes hops once TLS wrapping means the concrete type varies hop to hop.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Blanket bound satisfied by any stream a handshake engine can drive:
/// a plain `TcpStream`, a `tokio_rustls` TLS stream, or a previously
/// tunneled hop.
pub trait AsyncReadWrite: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> AsyncReadWrite for T {}

/// A type-erased, owned stream. Once a chain has wrapped a hop in TLS its
/// concrete type can no longer be named uniformly across hops, so this is
/// the type the connector and chain driver hand back to callers.
pub type BoxedStream = Box<dyn AsyncReadWrite>;

/// Wraps any `AsyncRead + AsyncWrite` value as a [`BoxedStream`].
pub fn box_stream<S: AsyncReadWrite + 'static>(stream: S) -> BoxedStream {
    Box::new(stream)
}

/// A stream with bytes already read off the wire that must be delivered
/// before any further reads reach the underlying stream.
///
/// Preserves the requirement that bytes read past the HTTP CONNECT
/// response's `\r\n\r\n` terminator (in the same `read` call that found
/// the terminator) are not discarded: they are the first bytes of the
/// tunneled payload.
pub struct Prefixed<S> {
    prefix: Vec<u8>,
    prefix_pos: usize,
    inner: S,
}

impl<S> Prefixed<S> {
    pub fn new(prefix: Vec<u8>, inner: S) -> Prefixed<S> {
        Prefixed {
            prefix,
            prefix_pos: 0,
            inner,
        }
    }

    fn has_prefix_remaining(&self) -> bool {
        self.prefix_pos < self.prefix.len()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Prefixed<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.has_prefix_remaining() {
            let remaining = &self.prefix[self.prefix_pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.prefix_pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Prefixed<S> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn delivers_prefix_before_inner_bytes() {
        let inner = std::io::Cursor::new(b"REST".to_vec());
        let mut prefixed = Prefixed::new(b"PRE-".to_vec(), inner);

        let mut out = Vec::new();
        prefixed.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"PRE-REST");
    }

    #[tokio::test]
    async fn empty_prefix_reads_straight_through() {
        let inner = std::io::Cursor::new(b"hello".to_vec());
        let mut prefixed = Prefixed::new(Vec::new(), inner);

        let mut out = Vec::new();
        prefixed.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn fragmented_prefix_terminator_still_reassembles() {
        // Simulates the terminator landing mid-buffer across 4 fragmented
        // reads: each fragment is delivered as its own prefix feeding into
        // the next read call, preserving trailing bytes into the tunnel.
        let fragments: Vec<Vec<u8>> = vec![
            b"HTTP/1.1 200".to_vec(),
            b" Connection".to_vec(),
            b" established\r\n\r\n".to_vec(),
            b"tunnel-payload".to_vec(),
        ];
        let mut reassembled = Vec::new();
        for fragment in fragments {
            let inner = std::io::Cursor::new(Vec::new());
            let mut prefixed = Prefixed::new(fragment, inner);
            let mut out = Vec::new();
            prefixed.read_to_end(&mut out).await.unwrap();
            reassembled.extend_from_slice(&out);
        }
        assert!(reassembled.ends_with(b"tunnel-payload"));
    }
}
