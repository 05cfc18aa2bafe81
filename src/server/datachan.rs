//! Data channel manager (C4): opens or accepts the secondary TCP connection used for a single
//! transfer, active (`PORT`/`EPRT`) or passive (`PASV`/`EPSV`), and applies the ASCII/Image byte
//! translation negotiated by `TYPE`.

use crate::server::session::{DataChanEndpoint, TransferType};

use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use tokio::net::{TcpListener, TcpStream};

/// Binds an ephemeral listener for `PASV`/`EPSV` on `local_ip`, scanning `ports` for a free one.
pub(crate) async fn bind_passive(local_ip: IpAddr, ports: RangeInclusive<u16>) -> std::io::Result<TcpListener> {
    let mut last_err = None;
    for port in ports {
        match TcpListener::bind(SocketAddr::new(local_ip, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no free passive port")))
}

/// Establishes the data connection for the transfer about to start, consuming the negotiated
/// endpoint: dials out for `Active`, accepts the single pending connection for `Passive`.
pub(crate) async fn establish(endpoint: DataChanEndpoint) -> std::io::Result<TcpStream> {
    match endpoint {
        DataChanEndpoint::Active(addr) => TcpStream::connect(addr).await,
        DataChanEndpoint::Passive(listener) => {
            let (stream, _peer) = listener.accept().await?;
            Ok(stream)
        }
    }
}

/// Translates a buffer of file bytes to the wire representation for `TransferType::Ascii`
/// (bare `\n` becomes `\r\n`), or passes it through unchanged for `TransferType::Image`.
pub(crate) fn to_wire(transfer_type: TransferType, data: &[u8]) -> Vec<u8> {
    match transfer_type {
        TransferType::Image => data.to_vec(),
        TransferType::Ascii => {
            let mut out = Vec::with_capacity(data.len());
            let mut prev_cr = false;
            for &b in data {
                if b == b'\n' && !prev_cr {
                    out.push(b'\r');
                }
                out.push(b);
                prev_cr = b == b'\r';
            }
            out
        }
    }
}

/// Translates wire bytes received for `TransferType::Ascii` back to local representation
/// (`\r\n` becomes `\n`), or passes them through unchanged for `TransferType::Image`.
pub(crate) fn from_wire(transfer_type: TransferType, data: &[u8]) -> Vec<u8> {
    match transfer_type {
        TransferType::Image => data.to_vec(),
        TransferType::Ascii => {
            let mut out = Vec::with_capacity(data.len());
            let mut i = 0;
            while i < data.len() {
                if data[i] == b'\r' && i + 1 < data.len() && data[i + 1] == b'\n' {
                    out.push(b'\n');
                    i += 2;
                } else {
                    out.push(data[i]);
                    i += 1;
                }
            }
            out
        }
    }
}
