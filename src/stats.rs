//! Transfer and timing recorders for protocol runs.
//!
//! All parties run in-process, so nothing is actually serialized; the
//! recorders observe what a networked deployment would have sent and how
//! long each role spent computing, without feeding anything back into the
//! protocols.

use std::time::Duration;

/// Role identifier inside one protocol run. The assignment is
/// protocol-specific; see the engine docs in [crate::protocol].
pub type RoleId = usize;

/// Which half of a role's work a duration belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Local precomputation up to and including the first message.
    Setup,
    /// Everything after the first message went out.
    Online,
}

/// Estimated wire size of a message.
pub trait PayloadSize {
    /// Number of bytes a serialized form of `self` would occupy.
    fn payload_bytes(&self) -> u64;
}

impl<T: PayloadSize> PayloadSize for [T] {
    fn payload_bytes(&self) -> u64 {
        self.iter().map(PayloadSize::payload_bytes).sum()
    }
}

impl<T: PayloadSize> PayloadSize for Vec<T> {
    fn payload_bytes(&self) -> u64 {
        self.as_slice().payload_bytes()
    }
}

/// Byte counts for every directed (from, to) pair of one run.
#[derive(Clone, Debug)]
pub struct TransferLog {
    sent: Vec<Vec<u64>>,
}

impl TransferLog {
    /// A log for `num_roles` roles with all counters zeroed.
    pub fn new(num_roles: usize) -> Self {
        Self {
            sent: vec![vec![0; num_roles]; num_roles],
        }
    }

    /// Number of roles the log was sized for.
    pub fn num_roles(&self) -> usize {
        self.sent.len()
    }

    /// Record `bytes` flowing from `from` to `to`.
    pub fn record(&mut self, from: RoleId, to: RoleId, bytes: u64) {
        self.sent[from][to] += bytes;
    }

    /// Bytes sent from `from` to `to`.
    pub fn sent(&self, from: RoleId, to: RoleId) -> u64 {
        self.sent[from][to]
    }

    /// Total bytes sent by `role`.
    pub fn total_sent(&self, role: RoleId) -> u64 {
        self.sent[role].iter().sum()
    }

    /// Total bytes received by `role`.
    pub fn total_received(&self, role: RoleId) -> u64 {
        self.sent.iter().map(|row| row[role]).sum()
    }

    /// Total traffic of the run.
    pub fn total(&self) -> u64 {
        self.sent.iter().flatten().sum()
    }
}

/// Per-role elapsed computation time, split into phases.
#[derive(Clone, Debug)]
pub struct Timings {
    setup: Vec<Duration>,
    online: Vec<Duration>,
}

impl Timings {
    /// Zeroed timings for `num_roles` roles.
    pub fn new(num_roles: usize) -> Self {
        Self {
            setup: vec![Duration::ZERO; num_roles],
            online: vec![Duration::ZERO; num_roles],
        }
    }

    /// Number of roles.
    pub fn num_roles(&self) -> usize {
        self.setup.len()
    }

    /// Add `elapsed` to `role`'s accumulated time in `phase`.
    pub fn record(&mut self, role: RoleId, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Setup => self.setup[role] += elapsed,
            Phase::Online => self.online[role] += elapsed,
        }
    }

    /// Accumulated setup time of `role`.
    pub fn setup(&self, role: RoleId) -> Duration {
        self.setup[role]
    }

    /// Accumulated online time of `role`.
    pub fn online(&self, role: RoleId) -> Duration {
        self.online[role]
    }
}

/// The two recorders of one run, bundled.
#[derive(Clone, Debug)]
pub struct ProtocolStats {
    /// Message sizes exchanged between roles.
    pub transfers: TransferLog,
    /// Per-role elapsed time.
    pub timings: Timings,
}

impl ProtocolStats {
    /// Fresh recorders for `num_roles` roles.
    pub fn new(num_roles: usize) -> Self {
        Self {
            transfers: TransferLog::new(num_roles),
            timings: Timings::new(num_roles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    impl PayloadSize for Fixed {
        fn payload_bytes(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_transfer_log_totals() {
        let mut log = TransferLog::new(3);

        log.record(0, 1, 100);
        log.record(0, 2, 50);
        log.record(1, 0, 7);
        log.record(0, 1, 1);

        assert_eq!(log.sent(0, 1), 101);
        assert_eq!(log.total_sent(0), 151);
        assert_eq!(log.total_received(0), 7);
        assert_eq!(log.total_received(1), 101);
        assert_eq!(log.total(), 158);
        assert_eq!(log.num_roles(), 3);
    }

    #[test]
    fn test_timings_accumulate_per_phase() {
        let mut timings = Timings::new(2);

        timings.record(0, Phase::Setup, Duration::from_millis(5));
        timings.record(0, Phase::Setup, Duration::from_millis(3));
        timings.record(0, Phase::Online, Duration::from_millis(2));

        assert_eq!(timings.setup(0), Duration::from_millis(8));
        assert_eq!(timings.online(0), Duration::from_millis(2));
        assert_eq!(timings.setup(1), Duration::ZERO);
    }

    #[test]
    fn test_payload_of_collections() {
        let batch = vec![Fixed(3), Fixed(4)];
        assert_eq!(batch.payload_bytes(), 7);
        assert_eq!([Fixed(10)].payload_bytes(), 10);
    }
}
