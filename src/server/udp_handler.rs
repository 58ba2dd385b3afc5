use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

use crate::protocol::messages::{PayloadSegmentHeader, RequestMessage, SEGMENT_CHUNK_CAPACITY};
use crate::server::tcp_handler::FILL_BYTE;

/// Receives request datagrams on the shared UDP socket and spawns one segment
///  sender per valid request, so a slow transfer never blocks the next request.
///  Only this loop ever receives on the socket; the spawned senders only send.
pub async fn run_request_loop(socket: Arc<UdpSocket>) -> anyhow::Result<()> {
    let mut buf = [0u8; 1024];

    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(x) => x,
            Err(e) => {
                error!("error receiving UDP request: {}", e);
                continue;
            }
        };

        if len != RequestMessage::SERIALIZED_LEN {
            debug!("ignoring {}-byte datagram from {}", len, from);
            continue;
        }
        match RequestMessage::deser(&mut &buf[..len]) {
            Ok(request) => {
                debug!("received {:?} over UDP from {}", request, from);
                let socket = socket.clone();
                tokio::spawn(async move {
                    match send_segments(&socket, from, request.file_size).await {
                        Ok(segments) => debug!("sent {} segments to {}", segments, from),
                        Err(e) => warn!("aborting UDP transfer to {}: {}", from, e),
                    }
                });
            }
            Err(e) => debug!("ignoring datagram from {}: {}", from, e),
        }
    }
}

/// Number of segments a transfer of `file_size` bytes is split into.
pub fn segment_count(file_size: u64) -> u64 {
    file_size.div_ceil(SEGMENT_CHUNK_CAPACITY as u64)
}

/// Emits the full segment sequence for one transfer back to the requester:
///  `segment_count` datagrams with strictly increasing indices whose chunks sum
///  to exactly `file_size` bytes. Best-effort by design - no acknowledgment, no
///  retransmission, no flow control.
pub async fn send_segments(socket: &UdpSocket, to: SocketAddr, file_size: u64) -> anyhow::Result<u64> {
    let total_segments = segment_count(file_size);
    let chunk = [FILL_BYTE; SEGMENT_CHUNK_CAPACITY];
    let mut buf = BytesMut::with_capacity(PayloadSegmentHeader::SERIALIZED_LEN + SEGMENT_CHUNK_CAPACITY);

    let mut remaining = file_size;
    for current_segment in 0..total_segments {
        let n = remaining.min(SEGMENT_CHUNK_CAPACITY as u64) as usize;

        buf.clear();
        PayloadSegmentHeader {
            total_segments,
            current_segment,
        }.ser(&mut buf);
        buf.put_slice(&chunk[..n]);

        socket.send_to(buf.as_ref(), to).await?;
        remaining -= n as u64;
    }
    Ok(total_segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(0, 0)]
    #[case::one_byte(1, 1)]
    #[case::exactly_one_chunk(1020, 1)]
    #[case::one_chunk_plus_one(1021, 2)]
    #[case::one_mib(1024 * 1024, 1029)]
    fn test_segment_count(#[case] file_size: u64, #[case] expected: u64) {
        assert_eq!(segment_count(file_size), expected);
    }

    #[rstest]
    #[case::empty(0)]
    #[case::partial_chunk(5)]
    #[case::exact_chunks(3 * 1020)]
    #[case::uneven(10 * 1020 + 5)]
    #[tokio::test]
    async fn test_send_segments(#[case] file_size: u64) {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let to = receiver.local_addr().unwrap();

        let sent = send_segments(&sender, to, file_size).await.unwrap();
        assert_eq!(sent, segment_count(file_size));

        let mut buf = [0u8; 2048];
        let mut payload_total = 0u64;
        let mut indices = Vec::new();
        for _ in 0..sent {
            let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
            let mut b = &buf[..len];
            let header = PayloadSegmentHeader::deser(&mut b).unwrap();
            assert_eq!(header.total_segments, sent);
            indices.push(header.current_segment);
            payload_total += b.len() as u64;
        }

        assert_eq!(payload_total, file_size);
        assert_eq!(indices, (0..sent).collect::<Vec<_>>());
    }
}
