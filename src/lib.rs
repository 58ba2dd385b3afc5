//! Ad-hoc LAN throughput measurement between one server and any number of
//!  clients, over a small binary protocol:
//!
//! * the server broadcasts an *offer* datagram once per second on a well-known
//!   discovery port, advertising its TCP and UDP transfer ports
//! * a client picks up the first valid offer, then runs a configurable number
//!   of concurrent TCP and UDP downloads of the same size against that server
//! * each transfer is timed independently; the client reports per-transfer
//!   throughput and, for UDP, the share of the requested bytes that arrived
//!
//! ## Wire format
//!
//! All integers in network byte order. Every message starts with the magic
//!  cookie `0xABCDDCBA` and a one-byte type tag; anything else is discarded.
//!
//! ```ascii
//! Offer (9 bytes):      u32 cookie | u8 type=0x2 | u16 udp_port | u16 tcp_port
//! Request (13 bytes):   u32 cookie | u8 type=0x3 | u64 file_size
//! Segment (21+N bytes): u32 cookie | u8 type=0x4 | u64 total_segments
//!                       | u64 current_segment | N chunk bytes (N <= 1020)
//! ```
//!
//! A TCP transfer is one request followed by exactly `file_size` raw bytes and
//!  a close - no inner framing. A UDP transfer is one request followed by
//!  `ceil(file_size / 1020)` best-effort segments; lost segments are not
//!  retransmitted, the client simply reports what arrived. A UDP transfer ends
//!  when all bytes arrived or after one second of silence.
//!
//! ## Port layout
//!
//! TCP transfers on the configured base port, UDP requests on base+1,
//!  discovery broadcasts on base+2. Client and server must agree on the base.

pub mod client;
pub mod config;
pub mod protocol;
pub mod report;
pub mod server;
