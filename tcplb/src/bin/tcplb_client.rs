use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

#[derive(Parser)]
#[command(version, about = "Sends lines through tcplb and prints the acknowledgements")]
struct Cli {
    #[arg(long)]
    connect: SocketAddr,

    #[arg(long, default_value = "hello")]
    message: String,

    /// Number of connections, opened one after another
    #[arg(long, default_value_t = 1)]
    count: usize,

    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,
}

async fn send_line(
    addr: SocketAddr,
    message: &str,
    wait: Duration,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut conn = TcpStream::connect(addr).await?;
    conn.write_all(message.as_bytes()).await?;
    conn.write_all(b"\n").await?;

    let mut response = Vec::new();
    timeout(wait, conn.read_to_end(&mut response)).await??;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let wait = Duration::from_millis(cli.timeout_ms);

    for _ in 0..cli.count {
        let response = send_line(cli.connect, &cli.message, wait).await?;
        if response.is_empty() {
            eprintln!("connection closed without a response");
        } else {
            print!("{}", response);
        }
    }

    Ok(())
}
