use crate::domain::Timestamp;
use crate::ports::TimeSource;

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Timestamp::new(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}
