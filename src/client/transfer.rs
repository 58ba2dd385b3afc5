use bytes::BytesMut;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::messages::{PayloadSegmentHeader, RequestMessage, MAX_DATAGRAM_LEN};
use crate::report::{TransferProtocol, TransferReport};

const READ_BUF_LEN: usize = 64 * 1024;

/// One TCP download: connect, request `size` bytes, read until they arrived or
///  the server closed the stream. TCP's own close semantics signal completion,
///  so there is no timeout here.
pub async fn run_tcp_transfer(index: usize, tcp_addr: SocketAddr, size: u64) -> anyhow::Result<TransferReport> {
    let mut stream = TcpStream::connect(tcp_addr).await?;

    let mut request_buf = BytesMut::with_capacity(RequestMessage::SERIALIZED_LEN);
    RequestMessage { file_size: size }.ser(&mut request_buf);
    stream.write_all(request_buf.as_ref()).await?;

    let started = Instant::now();
    let mut read_buf = vec![0u8; READ_BUF_LEN];
    let mut bytes_received = 0u64;

    while bytes_received < size {
        // never read past the requested size, so bytes_received stays <= size
        let want = (size - bytes_received).min(READ_BUF_LEN as u64) as usize;
        let n = stream.read(&mut read_buf[..want]).await?;
        if n == 0 {
            debug!("transfer #{}: server closed the stream after {} of {} bytes", index, bytes_received, size);
            break;
        }
        bytes_received += n as u64;
    }

    Ok(TransferReport {
        index,
        protocol: TransferProtocol::Tcp,
        requested_bytes: size,
        bytes_received,
        elapsed: started.elapsed(),
    })
}

/// One UDP download on its own dedicated socket - the protocol carries no
///  session id, so sharing a socket between concurrent transfers would make
///  their segments indistinguishable.
///
/// The transfer ends once `size` bytes arrived, or after `silence_timeout`
///  without an accepted segment (all data arrived, or the rest is presumed
///  lost). The receive timeout is re-armed on every iteration.
pub async fn run_udp_transfer(index: usize, udp_addr: SocketAddr, size: u64, silence_timeout: Duration) -> anyhow::Result<TransferReport> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

    let mut request_buf = BytesMut::with_capacity(RequestMessage::SERIALIZED_LEN);
    RequestMessage { file_size: size }.ser(&mut request_buf);
    socket.send_to(request_buf.as_ref(), udp_addr).await?;

    let started = Instant::now();
    let mut last_segment_at = Instant::now();
    let mut bytes_received = 0u64;
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    while bytes_received < size {
        match timeout(silence_timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => {
                let mut b = &buf[..len];
                match PayloadSegmentHeader::deser(&mut b) {
                    Ok(header) => {
                        debug!("transfer #{}: received {:?}, {} chunk bytes", index, header, b.len());
                        bytes_received += b.len() as u64;
                        last_segment_at = Instant::now();
                    }
                    Err(e) => debug!("transfer #{}: ignoring datagram from {}: {}", index, from, e),
                }
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                if last_segment_at.elapsed() >= silence_timeout {
                    debug!("transfer #{}: no segment for {:?}, assuming end of stream", index, silence_timeout);
                    break;
                }
            }
        }
    }

    Ok(TransferReport {
        index,
        protocol: TransferProtocol::Udp,
        requested_bytes: size,
        bytes_received,
        elapsed: started.elapsed(),
    })
}
