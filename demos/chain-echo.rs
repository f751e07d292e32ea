use ansi_term::Color;
use clap::{App, Arg};
use proxy_tunnel::{Proxy, ProxyChain};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

/// Prints out beautiful script messages.
macro_rules! message {
    (Success, $m:expr $(, $a:expr)* $(,)?) => {
        print!("{} ", Color::Green.bold().paint("Success:"));
        println!($m, $($a), *);
    };
    (Info, $m:expr $(, $a:expr)* $(,)?) => {
        print!("{} ", Color::White.bold().paint("Info:"));
        println!($m, $($a), *);
    };
    (Error, $m:expr $(, $a:expr)* $(,)?) => {
        print!("{} ", Color::Red.bold().paint("Error:"));
        println!($m, $($a), *);
    };
    (Fatal, $m:expr $(, $a:expr)* $(,)?) => {{
        message!(Error, $m, $($a), *);
        std::process::exit(1)
    }};
}

/// `fatal` prints an error message and terminates the process if a result
/// or option turns out empty.
trait Fatal<T> {
    fn fatal(self, message: &str) -> T;
}

impl<T, E: std::fmt::Display> Fatal<T> for Result<T, E> {
    fn fatal(self, message: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => message!(Fatal, "{}: {}", message, e),
        }
    }
}

impl<T> Fatal<T> for Option<T> {
    fn fatal(self, message: &str) -> T {
        match self {
            Some(value) => value,
            None => message!(Fatal, "{}", message),
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = App::new("Example program tunneling through a chain of proxies")
        .version("0.1.0")
        .author("TonyGraim")
        .arg(
            Arg::with_name("proxies")
                .short("p")
                .long("proxies")
                .takes_value(true)
                .required(true)
                .help("Comma-separated proxy URLs, first hop first (e.g. socks5://host:1080,http://host:8080)"),
        )
        .arg(
            Arg::with_name("destination")
                .short("d")
                .long("destination")
                .takes_value(true)
                .required(true)
                .help("The destination in format `host:port`"),
        )
        .get_matches();

    let proxies = matches.value_of("proxies").unwrap();
    let destination = matches.value_of("destination").unwrap();
    let (dest_host, dest_port) = destination.rsplit_once(':').fatal("destination must be host:port");
    let dest_port: u16 = dest_port.parse().fatal("destination port must be numeric");

    let hops: Vec<Proxy> = proxies
        .split(',')
        .map(|url| Proxy::from_url(url).fatal("invalid proxy URL"))
        .collect();

    message!(Info, "driving a {}-hop chain towards {}", hops.len(), destination);

    let chain = ProxyChain::new(hops).fatal("cannot build an empty proxy chain");

    let mut stream = match chain.connect(dest_host, dest_port, false, Some(Duration::from_secs(8))).await {
        Ok(stream) => {
            message!(Success, "tunnel established");
            stream
        }
        Err(e) => message!(Fatal, "cannot establish tunnel: {}", e),
    };

    println!("Please enter a message to be sent.");
    print!("{} ", Color::White.bold().paint("Message:"));

    let mut input = String::new();
    std::io::stdin().read_line(&mut input).fatal("unable to read a line from stdin");

    let future = stream.write_all(input.as_bytes());
    timeout(Duration::from_secs(8), future)
        .await
        .fatal("timeout of 8 seconds reached")
        .fatal("unable to send the message");

    let mut response = String::new();
    let future = stream.read_to_string(&mut response);
    timeout(Duration::from_secs(8), future)
        .await
        .fatal("timeout of 8 seconds reached")
        .fatal("unable to receive a string from the service");

    message!(Success, "received message from the service: {}", response);
}
