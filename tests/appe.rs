#![allow(missing_docs)]

pub mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use common::{parse_pasv, read_data_from_server, read_from_server, send_to_server, tcp_connect, tcp_pasv_connect};
use tokio::io::AsyncWriteExt;

const PORT: u16 = 2152;

fn unique_filename(prefix: &str) -> String {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("{}_{}.txt", prefix, ts)
}

async fn login(stream: &tokio::net::TcpStream, buffer: &mut [u8]) {
    assert_eq!(read_from_server(buffer, stream).await, "220 Welcome test\r\n");
    send_to_server("USER test\r\n", stream).await;
    assert_eq!(read_from_server(buffer, stream).await, "331 User name okay, need password\r\n");
    send_to_server("PASS test\r\n", stream).await;
    assert_eq!(read_from_server(buffer, stream).await, "230 User logged in, proceed\r\n");
    send_to_server("TYPE I\r\n", stream).await;
    assert_eq!(read_from_server(buffer, stream).await, "200 Type set to I\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_appe_to_existing_file() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    let filename = unique_filename("appe_existing");

    login(&stream, &mut buffer).await;

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    let addr = parse_pasv(resp).unwrap();

    send_to_server(&format!("STOR {}\r\n", filename), &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        format!("150 Opening BINARY mode data connection for {}\r\n", filename)
    );

    let mut data_stream = tcp_pasv_connect(addr).await.unwrap();
    send_to_server("Hello", &data_stream).await;
    data_stream.shutdown().await.unwrap();
    drop(data_stream);

    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    let addr = parse_pasv(resp).unwrap();

    send_to_server(&format!("APPE {}\r\n", filename), &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        format!("150 Opening BINARY mode data connection for {}\r\n", filename)
    );

    let mut data_stream = tcp_pasv_connect(addr).await.unwrap();
    send_to_server(" World", &data_stream).await;
    data_stream.shutdown().await.unwrap();
    drop(data_stream);

    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    let addr = parse_pasv(resp).unwrap();

    send_to_server(&format!("RETR {}\r\n", filename), &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        format!("150 Opening BINARY mode data connection for {}\r\n", filename)
    );

    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let content = read_data_from_server(&data_stream).await;
    drop(data_stream);

    assert_eq!(content, b"Hello World");
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_appe_to_new_file() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    let filename = unique_filename("appe_new");

    login(&stream, &mut buffer).await;

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    let addr = parse_pasv(resp).unwrap();

    send_to_server(&format!("APPE {}\r\n", filename), &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        format!("150 Opening BINARY mode data connection for {}\r\n", filename)
    );

    let mut data_stream = tcp_pasv_connect(addr).await.unwrap();
    send_to_server("New content", &data_stream).await;
    data_stream.shutdown().await.unwrap();
    drop(data_stream);

    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    let addr = parse_pasv(resp).unwrap();

    send_to_server(&format!("RETR {}\r\n", filename), &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        format!("150 Opening BINARY mode data connection for {}\r\n", filename)
    );

    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let content = read_data_from_server(&data_stream).await;
    drop(data_stream);

    assert_eq!(content, b"New content");
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");
}
