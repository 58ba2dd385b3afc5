use std::fmt::{Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransferProtocol {
    Tcp,
    Udp,
}
impl Display for TransferProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferProtocol::Tcp => write!(f, "TCP"),
            TransferProtocol::Udp => write!(f, "UDP"),
        }
    }
}

/// Final statistics of one finished transfer. Each transfer task owns its record
///  exclusively; the orchestrator only sees it after the task completed.
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub index: usize,
    pub protocol: TransferProtocol,
    pub requested_bytes: u64,
    pub bytes_received: u64,
    pub elapsed: Duration,
}

impl TransferReport {
    /// `None` if the transfer finished too fast for the clock to notice - reported
    ///  as unmeasurable rather than dividing by zero.
    pub fn throughput_bits_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            None
        }
        else {
            Some(self.bytes_received as f64 * 8.0 / secs)
        }
    }

    /// Share of the requested bytes that actually arrived, clamped to 100: duplicate
    ///  or spurious segments must never make a transfer look better than complete.
    pub fn percent_received(&self) -> f64 {
        if self.requested_bytes == 0 {
            return 100.0;
        }
        f64::min(100.0, self.bytes_received as f64 * 100.0 / self.requested_bytes as f64)
    }
}

impl Display for TransferReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "transfer #{} ({}): {} bytes in {:.3}s, {}",
               self.index, self.protocol, self.bytes_received,
               self.elapsed.as_secs_f64(), format_throughput(self.throughput_bits_per_sec()))?;

        if self.protocol == TransferProtocol::Udp {
            write!(f, ", {:.1}% received", self.percent_received())?;
        }
        Ok(())
    }
}

fn format_throughput(bits_per_sec: Option<f64>) -> String {
    match bits_per_sec {
        None => "unmeasurable (zero elapsed time)".to_string(),
        Some(bps) if bps >= 1e9 => format!("{:.2} Gbit/s", bps / 1e9),
        Some(bps) if bps >= 1e6 => format!("{:.2} Mbit/s", bps / 1e6),
        Some(bps) if bps >= 1e3 => format!("{:.2} Kbit/s", bps / 1e3),
        Some(bps) => format!("{:.0} bit/s", bps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use TransferProtocol::*;

    fn report(protocol: TransferProtocol, requested: u64, received: u64, elapsed: Duration) -> TransferReport {
        TransferReport {
            index: 1,
            protocol,
            requested_bytes: requested,
            bytes_received: received,
            elapsed,
        }
    }

    #[rstest]
    #[case::complete(1000, 1000, 100.0)]
    #[case::half(1000, 500, 50.0)]
    #[case::nothing(1000, 0, 0.0)]
    #[case::overshoot_clamped(1000, 1500, 100.0)]
    #[case::zero_requested(0, 0, 100.0)]
    #[case::zero_requested_overshoot(0, 300, 100.0)]
    fn test_percent_received(#[case] requested: u64, #[case] received: u64, #[case] expected: f64) {
        let r = report(Udp, requested, received, Duration::from_secs(1));
        assert_eq!(r.percent_received(), expected);
        assert!(r.percent_received() >= 0.0 && r.percent_received() <= 100.0);
    }

    #[rstest]
    #[case::one_sec(1_000_000, Duration::from_secs(1), Some(8_000_000.0))]
    #[case::two_sec(1_000_000, Duration::from_secs(2), Some(4_000_000.0))]
    #[case::zero_elapsed(1_000_000, Duration::ZERO, None)]
    fn test_throughput(#[case] received: u64, #[case] elapsed: Duration, #[case] expected: Option<f64>) {
        let r = report(Tcp, received, received, elapsed);
        assert_eq!(r.throughput_bits_per_sec(), expected);
    }

    #[rstest]
    #[case::gbit(Some(2.5e9), "2.50 Gbit/s")]
    #[case::mbit(Some(8_000_000.0), "8.00 Mbit/s")]
    #[case::kbit(Some(1500.0), "1.50 Kbit/s")]
    #[case::bit(Some(42.0), "42 bit/s")]
    #[case::unmeasurable(None, "unmeasurable (zero elapsed time)")]
    fn test_format_throughput(#[case] bps: Option<f64>, #[case] expected: &str) {
        assert_eq!(format_throughput(bps), expected);
    }

    #[test]
    fn test_report_display() {
        let r = report(Udp, 1000, 500, Duration::from_secs(1));
        assert_eq!(format!("{}", r), "transfer #1 (UDP): 500 bytes in 1.000s, 4.00 Kbit/s, 50.0% received");

        let r = report(Tcp, 1000, 1000, Duration::from_secs(2));
        assert_eq!(format!("{}", r), "transfer #1 (TCP): 1000 bytes in 2.000s, 4.00 Kbit/s");
    }
}
