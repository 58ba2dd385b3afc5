use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::messages::RequestMessage;

/// The bulk data is filler - its content carries no meaning, only its length does.
pub const FILL_BYTE: u8 = b'0';

const WRITE_CHUNK_LEN: usize = 64 * 1024;

/// Serves one accepted connection: reads the fixed-size request, then streams
///  exactly the requested number of bytes and closes. Returns the number of
///  bytes served. Any error aborts only this connection.
pub async fn handle_connection(mut stream: TcpStream) -> anyhow::Result<u64> {
    let mut request_buf = [0u8; RequestMessage::SERIALIZED_LEN];
    stream.read_exact(&mut request_buf).await?;
    let request = RequestMessage::deser(&mut request_buf.as_ref())?;
    debug!("received {:?} over TCP", request);

    let chunk = vec![FILL_BYTE; WRITE_CHUNK_LEN];
    let mut remaining = request.file_size;
    while remaining > 0 {
        let n = remaining.min(WRITE_CHUNK_LEN as u64) as usize;
        stream.write_all(&chunk[..n]).await?;
        remaining -= n as u64;
    }

    stream.shutdown().await?;
    Ok(request.file_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rstest::rstest;
    use tokio::net::{TcpListener, TcpStream};

    async fn request_and_read_all(size: u64) -> Vec<u8> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let served = handle_connection(stream).await.unwrap();
            assert_eq!(served, size);
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = BytesMut::new();
        RequestMessage { file_size: size }.ser(&mut buf);
        stream.write_all(&buf).await.unwrap();

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    }

    #[rstest]
    #[case::empty(0)]
    #[case::tiny(1)]
    #[case::one_chunk(WRITE_CHUNK_LEN as u64)]
    #[case::chunk_plus_one(WRITE_CHUNK_LEN as u64 + 1)]
    #[case::several_chunks(300_000)]
    #[tokio::test]
    async fn test_serves_exactly_requested_size(#[case] size: u64) {
        let received = request_and_read_all(size).await;
        assert_eq!(received.len() as u64, size);
        assert!(received.iter().all(|&b| b == FILL_BYTE));
    }

    #[tokio::test]
    async fn test_rejects_malformed_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handler = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(stream).await
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"13 bytes of junk!").await.unwrap();

        assert!(handler.await.unwrap().is_err());
    }
}
