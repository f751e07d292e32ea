//! Connects through a single proxy to a destination and prints what the
//! handshake established. Takes one proxy URL and one `host:port`
//! destination.
//!
//! ```text
//! cargo run --example trivial -- socks5://127.0.0.1:1080 example.test:80
//! ```

use proxy_tunnel::Proxy;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let proxy_url = args.next().expect("usage: trivial <proxy-url> <host:port>");
    let dest = args.next().expect("usage: trivial <proxy-url> <host:port>");
    let (dest_host, dest_port) = dest.rsplit_once(':').expect("destination must be host:port");
    let dest_port: u16 = dest_port.parse().expect("destination port must be numeric");

    let proxy = Proxy::from_url(&proxy_url).expect("invalid proxy URL");

    println!("connecting to {dest_host}:{dest_port} through {proxy_url}");
    match proxy
        .connect(dest_host, dest_port, false, Some(Duration::from_secs(8)))
        .await
    {
        Ok(_stream) => println!("tunnel established"),
        Err(err) => {
            eprintln!("failed to establish tunnel: {err}");
            std::process::exit(1);
        }
    }
}
