use time::OffsetDateTime;

/// A source of transaction timestamps for hosts.
///
/// The engine itself never reads a clock: inside a transaction the present
/// instant is the timestamp carried by the ledger stub, which every replica
/// sees identically. Clocks only stamp transactions before they are executed.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// A clock that uses the wall clock of the local node.
///
/// Suitable for the submitting host only; two nodes reading it will disagree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock frozen at one instant. Used for replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    pub fn new(instant: OffsetDateTime) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
