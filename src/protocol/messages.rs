use anyhow::bail;
use bytes::{Buf, BufMut};
use std::fmt::{Debug, Formatter};

/// Every datagram and request of this protocol starts with this cookie; anything
///  else on the same socket is foreign traffic and gets discarded.
pub const MAGIC_COOKIE: u32 = 0xabcd_dcba;

pub const MESSAGE_TYPE_OFFER: u8 = 0x2;
pub const MESSAGE_TYPE_REQUEST: u8 = 0x3;
pub const MESSAGE_TYPE_PAYLOAD: u8 = 0x4;

/// Payload bytes per UDP segment. A full segment is 21 header bytes + this,
///  i.e. 1041 bytes on the wire, safely below typical MTUs.
pub const SEGMENT_CHUNK_CAPACITY: usize = 1020;

/// Largest datagram this protocol ever produces.
pub const MAX_DATAGRAM_LEN: usize = PayloadSegmentHeader::SERIALIZED_LEN + SEGMENT_CHUNK_CAPACITY;

fn deser_preamble(buf: &mut impl Buf, expected_type: u8) -> anyhow::Result<()> {
    let cookie = buf.try_get_u32()?;
    if cookie != MAGIC_COOKIE {
        bail!("bad magic cookie {:#x}", cookie);
    }
    let message_type = buf.try_get_u8()?;
    if message_type != expected_type {
        bail!("unexpected message type {:#x}, expected {:#x}", message_type, expected_type);
    }
    Ok(())
}

/// Broadcast by a server every second, advertising the ports it serves transfers on.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OfferMessage {
    pub udp_port: u16,
    pub tcp_port: u16,
}
impl Debug for OfferMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OFFER{{udp:{},tcp:{}}}", self.udp_port, self.tcp_port)
    }
}
impl OfferMessage {
    pub const SERIALIZED_LEN: usize = 9;

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u32(MAGIC_COOKIE);
        buf.put_u8(MESSAGE_TYPE_OFFER);
        buf.put_u16(self.udp_port);
        buf.put_u16(self.tcp_port);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<OfferMessage> {
        deser_preamble(buf, MESSAGE_TYPE_OFFER)?;
        Ok(OfferMessage {
            udp_port: buf.try_get_u16()?,
            tcp_port: buf.try_get_u16()?,
        })
    }
}

/// Sent once per transfer (over TCP or UDP alike) to ask the server for
///  `file_size` bytes of bulk data.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct RequestMessage {
    pub file_size: u64,
}
impl Debug for RequestMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "REQ{{{}B}}", self.file_size)
    }
}
impl RequestMessage {
    pub const SERIALIZED_LEN: usize = 13;

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u32(MAGIC_COOKIE);
        buf.put_u8(MESSAGE_TYPE_REQUEST);
        buf.put_u64(self.file_size);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<RequestMessage> {
        deser_preamble(buf, MESSAGE_TYPE_REQUEST)?;
        Ok(RequestMessage {
            file_size: buf.try_get_u64()?,
        })
    }
}

/// Header of one UDP bulk-data segment; the rest of the datagram is the chunk
///  itself. `deser` consumes exactly the header, leaving the chunk in the buffer.
///
/// UDP can drop or reorder segments, so a receiver must not rely on indices
///  arriving monotonically - completeness is judged on summed chunk lengths only.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct PayloadSegmentHeader {
    pub total_segments: u64,
    pub current_segment: u64,
}
impl Debug for PayloadSegmentHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SEG{{{}/{}}}", self.current_segment, self.total_segments)
    }
}
impl PayloadSegmentHeader {
    pub const SERIALIZED_LEN: usize = 21;

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u32(MAGIC_COOKIE);
        buf.put_u8(MESSAGE_TYPE_PAYLOAD);
        buf.put_u64(self.total_segments);
        buf.put_u64(self.current_segment);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<PayloadSegmentHeader> {
        deser_preamble(buf, MESSAGE_TYPE_PAYLOAD)?;
        Ok(PayloadSegmentHeader {
            total_segments: buf.try_get_u64()?,
            current_segment: buf.try_get_u64()?,
        })
    }
}
