#![allow(dead_code)]

use std::io::Error;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpStream;

use unftp_core_server::Server;

/// Starts a server rooted at a fresh temp directory, listening on `port`, authenticating as
/// `test`/`test`. Only the first call for a given `port` actually spawns it; later calls are
/// no-ops so each test file can share one server across its `#[tokio::test]` functions.
pub async fn initialize(port: u16) {
    start_once(port, false).await;
}

/// Like [`initialize`], but the configured user is restricted to read-only operations.
pub async fn initialize_read_only(port: u16) {
    start_once(port, true).await;
}

async fn start_once(port: u16, read_only: bool) {
    static STARTED: OnceLock<std::sync::Mutex<std::collections::HashSet<u16>>> = OnceLock::new();
    let started = STARTED.get_or_init(|| std::sync::Mutex::new(std::collections::HashSet::new()));
    let first = started.lock().unwrap().insert(port);
    if !first {
        return;
    }

    let root = tempfile::tempdir().expect("tempdir").keep();
    tokio::spawn(async move {
        let server = Server::new(root, "test", "test").greeting("Welcome test").read_only(read_only);
        server.listen(format!("127.0.0.1:{}", port)).await.unwrap();
    });
    // Give the listener a moment to bind before the first connection attempt.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}

pub async fn read_from_server<'a>(buffer: &'a mut [u8], stream: &TcpStream) -> &'a str {
    loop {
        stream.readable().await.unwrap();
        let n = match stream.try_read(buffer) {
            Ok(n) => n,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{}", e),
        };
        return std::str::from_utf8(&buffer[0..n]).unwrap();
    }
}

pub async fn send_to_server(buffer: &str, stream: &TcpStream) {
    loop {
        stream.writable().await.unwrap();
        match stream.try_write(buffer.as_bytes()) {
            Ok(_) => break,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{}", e),
        };
    }
}

pub async fn read_data_from_server(stream: &TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 1024];
    loop {
        stream.readable().await.unwrap();
        match stream.try_read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&buffer[..n]),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{}", e),
        }
    }
    data
}

pub async fn tcp_connect(port: u16) -> Result<TcpStream, Error> {
    let mut errcount = 0;
    loop {
        match TcpStream::connect(format!("127.0.0.1:{}", port)).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if errcount > 4 {
                    return Err(e);
                }
                errcount += 1;
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    }
}

pub async fn tcp_pasv_connect(addr: SocketAddr) -> Result<TcpStream, Error> {
    let mut errcount = 0;
    loop {
        match TcpStream::connect(addr).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if errcount > 4 {
                    return Err(e);
                }
                errcount += 1;
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        }
    }
}

/// Returns the data-channel address encoded in a standard FTP `227` reply line.
pub fn parse_pasv(line: &str) -> Result<SocketAddr, &'static str> {
    use std::net::{IpAddr, Ipv4Addr};

    let body = line.split_once('(').and_then(|(_, rest)| rest.split_once(')')).ok_or("bad format")?.0;
    let nums: Vec<u8> = body.split(',').filter_map(|s| s.trim().parse().ok()).collect();
    if nums.len() != 6 {
        return Err("need 6 numbers");
    }
    let port = u16::from(nums[4]) * 256 + u16::from(nums[5]);
    Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(nums[0], nums[1], nums[2], nums[3])), port))
}
