use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use tcplb_backend::{BackendError, BackendServer};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{sleep, timeout},
};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

async fn start_server(id: usize) -> BackendServer {
    let mut server = BackendServer::bind(id, LOCALHOST)
        .await
        .expect("failed to listen");
    server.serve();
    server
}

async fn read_response(conn: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    timeout(Duration::from_secs(5), conn.read_to_end(&mut buf))
        .await
        .expect("timed out waiting for response")
        .expect("failed to read");
    String::from_utf8(buf).unwrap()
}

async fn send_message(addr: SocketAddr, msg: &str) -> String {
    let mut conn = TcpStream::connect(addr).await.expect("failed to connect");
    conn.write_all(msg.as_bytes()).await.expect("failed to write");
    read_response(&mut conn).await
}

#[tokio::test]
async fn handles_a_single_line() {
    let mut server = start_server(1).await;

    let response = send_message(server.addr(), "Hello\n").await;
    assert_eq!(response, "Server 1 ACK: HELLO\n");

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handles_concurrent_connections() {
    let mut server = start_server(1).await;
    let addr = server.addr();

    let handles: Vec<_> = (0..5)
        .map(|conn_id| {
            tokio::spawn(async move {
                let msg = format!("Hello from connection {conn_id}\n");
                let response = send_message(addr, &msg).await;
                (msg, response)
            })
        })
        .collect();

    for handle in handles {
        let (msg, response) = handle.await.unwrap();
        assert_eq!(response, format!("Server 1 ACK: {}", msg.to_uppercase()));
    }

    server.close().await.unwrap();
}

#[tokio::test]
async fn fragmented_message_is_acknowledged_once() {
    let mut server = start_server(2).await;
    let mut conn = TcpStream::connect(server.addr()).await.unwrap();

    for fragment in ["H", "ello ", "World", "\n"] {
        conn.write_all(fragment.as_bytes()).await.unwrap();
        conn.flush().await.unwrap();
        sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(read_response(&mut conn).await, "Server 2 ACK: HELLO WORLD\n");

    server.close().await.unwrap();
}

#[tokio::test]
async fn partial_line_gets_no_response() {
    let mut server = start_server(3).await;
    let mut conn = TcpStream::connect(server.addr()).await.unwrap();

    conn.write_all(b"no newline here").await.unwrap();
    conn.shutdown().await.unwrap();

    assert_eq!(read_response(&mut conn).await, "");

    server.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_client_does_not_block_fast_client() {
    let mut server = start_server(4).await;
    let addr = server.addr();

    let mut slow = TcpStream::connect(addr).await.unwrap();
    slow.write_all(b"H").await.unwrap();

    let fast = timeout(Duration::from_secs(1), send_message(addr, "fast\n"))
        .await
        .expect("fast client was blocked by slow client");
    assert_eq!(fast, "Server 4 ACK: FAST\n");

    sleep(Duration::from_millis(200)).await;
    slow.write_all(b"ello\n").await.unwrap();
    assert_eq!(read_response(&mut slow).await, "Server 4 ACK: HELLO\n");

    server.close().await.unwrap();
}

#[tokio::test]
async fn closed_server_refuses_connections() {
    let mut server = start_server(5).await;
    let addr = server.addr();
    assert_eq!(send_message(addr, "up\n").await, "Server 5 ACK: UP\n");

    server.close().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());

    match server.close().await {
        Err(BackendError::AlreadyClosed { id }) => assert_eq!(id, 5),
        other => panic!("unexpected close result: {other:?}"),
    }
}
