use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ModelError, QUEUE_SUFFIX, RESOURCE_MANAGER_WORKER_NAME, SCHEDULER_WORKER_NAME};

/// Unique worker identity in the form `"<role>@<host>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerName(String);

impl WorkerName {
    /// Build a name from its parts.
    pub fn new(role: impl AsRef<str>, host: impl AsRef<str>) -> Self {
        Self(format!("{}@{}", role.as_ref(), host.as_ref()))
    }

    /// Build a name for a worker running on this machine.
    pub fn local(role: impl AsRef<str>) -> Result<Self, ModelError> {
        let host = hostname::get().map_err(|e| ModelError::Hostname(e.to_string()))?;
        let host = host
            .to_str()
            .ok_or_else(|| ModelError::Hostname("hostname is not valid utf-8".into()))?;
        Ok(Self::new(role, host))
    }

    /// Parse a name, requiring a non-empty role and host around a single `@`.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.split_once('@') {
            Some((role, host)) if !role.is_empty() && !host.is_empty() && !host.contains('@') => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ModelError::InvalidWorkerName(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Role part of the name; the whole name when there is no `@`.
    pub fn role(&self) -> &str {
        self.0.split_once('@').map(|(r, _)| r).unwrap_or(&self.0)
    }

    /// Host part of the name, if present.
    pub fn host(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, h)| h)
    }

    /// Name of the queue this worker is uniquely subscribed to.
    pub fn queue_name(&self) -> String {
        format!("{}{}", self.0, QUEUE_SUFFIX)
    }

    /// Returns `false` for control-plane identities that must never receive resource-bound work.
    ///
    /// Matched by prefix because the host part is not known in advance.
    pub fn is_assignable(&self) -> bool {
        !(self.0.starts_with(SCHEDULER_WORKER_NAME)
            || self.0.starts_with(RESOURCE_MANAGER_WORKER_NAME))
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for WorkerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_worker_is_assignable() {
        assert!(WorkerName::from("a_worker@some.hostname").is_assignable());
    }

    #[test]
    fn scheduler_is_not_assignable() {
        assert!(!WorkerName::from("scheduler@some.hostname").is_assignable());
    }

    #[test]
    fn resource_manager_is_not_assignable() {
        assert!(!WorkerName::from("resource_manager@some.hostname").is_assignable());
    }

    #[test]
    fn queue_name_appends_suffix() {
        let name = WorkerName::new("reserved_resource_worker-0", "host1");
        assert_eq!(name.queue_name(), "reserved_resource_worker-0@host1.dq");
    }

    #[test]
    fn role_and_host_split() {
        let name = WorkerName::from("worker-1@example.com");
        assert_eq!(name.role(), "worker-1");
        assert_eq!(name.host(), Some("example.com"));
    }

    #[test]
    fn parse_rejects_malformed_names() {
        assert!(WorkerName::parse("worker@host").is_ok());
        assert!(WorkerName::parse("worker").is_err());
        assert!(WorkerName::parse("@host").is_err());
        assert!(WorkerName::parse("worker@").is_err());
        assert!(WorkerName::parse("a@b@c").is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let name = WorkerName::from("w@h");
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""w@h""#);
    }
}
