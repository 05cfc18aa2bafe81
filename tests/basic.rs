#![allow(missing_docs)]

pub mod common;

use common::{parse_pasv, read_data_from_server, read_from_server, send_to_server, tcp_connect, tcp_pasv_connect};
use tokio::io::AsyncWriteExt;

const PORT: u16 = 2153;
const RO_PORT: u16 = 2154;

async fn login(stream: &tokio::net::TcpStream, buffer: &mut [u8]) {
    assert_eq!(read_from_server(buffer, stream).await, "220 Welcome test\r\n");
    send_to_server("USER test\r\n", stream).await;
    assert_eq!(read_from_server(buffer, stream).await, "331 User name okay, need password\r\n");
    send_to_server("PASS test\r\n", stream).await;
    assert_eq!(read_from_server(buffer, stream).await, "230 User logged in, proceed\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_auth_success_then_quit() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];

    assert_eq!(read_from_server(&mut buffer, &stream).await, "220 Welcome test\r\n");
    send_to_server("USER test\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "331 User name okay, need password\r\n");
    send_to_server("PASS test\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "230 User logged in, proceed\r\n");
    send_to_server("QUIT\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "221 Service closing control connection\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_list_on_empty_root() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;

    send_to_server("TYPE I\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "200 Type set to I\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    assert!(resp.starts_with("227 Entering Passive Mode (127,0,0,1,"));
    let addr = parse_pasv(resp).unwrap();

    send_to_server("LIST\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "150 Opening BINARY mode data connection for file list\r\n");

    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let content = read_data_from_server(&data_stream).await;
    drop(data_stream);

    assert!(content.is_empty());
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_mkd_list_rmd() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;

    send_to_server("MKD test_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/test_dir\" created\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let addr = parse_pasv(read_from_server(&mut buffer, &stream).await).unwrap();
    send_to_server("LIST\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "150 Opening BINARY mode data connection for file list\r\n");
    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let listing = String::from_utf8(read_data_from_server(&data_stream).await).unwrap();
    drop(data_stream);
    assert!(listing.contains("test_dir"), "listing was: {:?}", listing);
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");

    send_to_server("RMD test_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "250 Directory deleted\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let addr = parse_pasv(read_from_server(&mut buffer, &stream).await).unwrap();
    send_to_server("LIST\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "150 Opening BINARY mode data connection for file list\r\n");
    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let listing = String::from_utf8(read_data_from_server(&data_stream).await).unwrap();
    drop(data_stream);
    assert!(!listing.contains("test_dir"));
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_stor_then_retr_and_size() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;
    send_to_server("TYPE I\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "200 Type set to I\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let addr = parse_pasv(read_from_server(&mut buffer, &stream).await).unwrap();
    send_to_server("STOR test_file.txt\r\n", &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        "150 Opening BINARY mode data connection for test_file.txt\r\n"
    );
    let mut data_stream = tcp_pasv_connect(addr).await.unwrap();
    send_to_server("Hello, FTP!", &data_stream).await;
    data_stream.shutdown().await.unwrap();
    drop(data_stream);
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");

    send_to_server("SIZE test_file.txt\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "213 11\r\n");

    send_to_server("PASV\r\n", &stream).await;
    let addr = parse_pasv(read_from_server(&mut buffer, &stream).await).unwrap();
    send_to_server("RETR test_file.txt\r\n", &stream).await;
    assert_eq!(
        read_from_server(&mut buffer, &stream).await,
        "150 Opening BINARY mode data connection for test_file.txt\r\n"
    );
    let data_stream = tcp_pasv_connect(addr).await.unwrap();
    let content = read_data_from_server(&data_stream).await;
    drop(data_stream);
    assert_eq!(content, b"Hello, FTP!");
    assert_eq!(read_from_server(&mut buffer, &stream).await, "226 Transfer complete\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_cwd_nested() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;

    send_to_server("MKD outer_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/outer_dir\" created\r\n");

    send_to_server("CWD outer_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "250 Directory changed to /outer_dir\r\n");

    send_to_server("MKD inner_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/outer_dir/inner_dir\" created\r\n");

    send_to_server("PWD\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/outer_dir\" is current directory\r\n");

    send_to_server("CWD inner_dir\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "250 Directory changed to /outer_dir/inner_dir\r\n");

    send_to_server("PWD\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/outer_dir/inner_dir\" is current directory\r\n");

    send_to_server("CWD ..\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "250 Directory changed to /outer_dir\r\n");

    send_to_server("PWD\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "257 \"/outer_dir\" is current directory\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_syst() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;

    send_to_server("SYST\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "215 UNIX Type: L8\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_bad_login_reverts_to_awaiting_user() {
    common::initialize(PORT).await;

    let stream = tcp_connect(PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];

    assert_eq!(read_from_server(&mut buffer, &stream).await, "220 Welcome test\r\n");
    send_to_server("USER test\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "331 User name okay, need password\r\n");
    send_to_server("PASS wrong\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "530 Not logged in\r\n");

    send_to_server("PWD\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "530 Not logged in\r\n");
}

#[tokio::test(flavor = "current_thread")]
async fn test_read_only_rejects_stor() {
    common::initialize_read_only(RO_PORT).await;

    let stream = tcp_connect(RO_PORT).await.unwrap();
    let mut buffer = vec![0_u8; 1024];
    login(&stream, &mut buffer).await;

    send_to_server("PASV\r\n", &stream).await;
    let resp = read_from_server(&mut buffer, &stream).await;
    assert!(resp.starts_with("227"));

    send_to_server("STOR forbidden.txt\r\n", &stream).await;
    assert_eq!(read_from_server(&mut buffer, &stream).await, "550 Permission denied\r\n");
}
