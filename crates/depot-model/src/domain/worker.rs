use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::WorkerName;

/// A live worker together with its most recent heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Unique worker name, `"<role>@<host>"`.
    pub name: WorkerName,
    /// When the last heartbeat from this worker was received.
    #[serde(with = "super::time_serde")]
    pub last_heartbeat: SystemTime,
}

impl Worker {
    pub fn new(name: impl Into<WorkerName>, last_heartbeat: SystemTime) -> Self {
        Self {
            name: name.into(),
            last_heartbeat,
        }
    }

    /// Name of the queue this worker is uniquely subscribed to.
    #[inline]
    pub fn queue_name(&self) -> String {
        self.name.queue_name()
    }

    /// Returns `true` if the last heartbeat is older than `timeout` relative to `now`.
    pub fn is_stale(&self, now: SystemTime, timeout: std::time::Duration) -> bool {
        now.duration_since(self.last_heartbeat)
            .map(|age| age > timeout)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn worker_serde_roundtrip() {
        let worker = Worker::new("w1@host", UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        let json = serde_json::to_string(&worker).unwrap();
        assert!(json.contains("\"lastHeartbeat\":1700000000"));

        let back: Worker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, worker);
    }

    #[test]
    fn heartbeat_in_the_future_is_not_stale() {
        let now = UNIX_EPOCH + Duration::from_secs(100);
        let worker = Worker::new("w1@host", now + Duration::from_secs(5));
        assert!(!worker.is_stale(now, Duration::from_secs(1)));
    }

    #[test]
    fn stale_after_timeout() {
        let now = UNIX_EPOCH + Duration::from_secs(100);
        let worker = Worker::new("w1@host", UNIX_EPOCH + Duration::from_secs(60));
        assert!(worker.is_stale(now, Duration::from_secs(30)));
        assert!(!worker.is_stale(now, Duration::from_secs(40)));
    }
}
