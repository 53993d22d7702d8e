use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::ElectroDevice;

/// Identifies one browser session's device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("session already holds the maximum of {limit} devices")]
    Full { limit: usize },
}

#[derive(Default)]
struct Session {
    devices: Vec<ElectroDevice>,
    /// Value of the registry's append counter at the last append
    last_append: u64,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<SessionId, Session>,
    appends: u64,
}

impl Sessions {
    /// Drop the session whose last append is the oldest.
    fn evict_least_recent(&mut self) -> Option<SessionId> {
        let oldest = self
            .by_id
            .iter()
            .min_by_key(|(_, s)| s.last_append)
            .map(|(id, _)| *id)?;
        self.by_id.remove(&oldest);
        Some(oldest)
    }
}

/// Append-only device lists, one per session.
///
/// Every call takes the lock once, so concurrent submissions to the same
/// session are serialized and none is lost. At most `max_sessions` lists are
/// kept; starting one more evicts the session that was appended to least
/// recently.
pub struct DeviceRegistry {
    sessions: RwLock<Sessions>,
    max_devices_per_session: usize,
    max_sessions: usize,
}

impl DeviceRegistry {
    pub fn new(max_devices_per_session: usize, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            max_devices_per_session,
            max_sessions,
        }
    }

    /// Append a device, creating the session on first use.
    ///
    /// Returns the number of devices the session holds afterwards. A rejected
    /// append leaves the registry untouched.
    pub fn append(&self, session: SessionId, device: ElectroDevice) -> Result<usize, RegistryError> {
        let mut sessions = self.sessions.write();
        let stored = sessions.by_id.get(&session).map_or(0, |s| s.devices.len());
        if stored >= self.max_devices_per_session {
            warn!(%session, limit = self.max_devices_per_session, "device limit reached");
            return Err(RegistryError::Full {
                limit: self.max_devices_per_session,
            });
        }

        if !sessions.by_id.contains_key(&session) && sessions.by_id.len() >= self.max_sessions {
            if let Some(evicted) = sessions.evict_least_recent() {
                info!(%evicted, limit = self.max_sessions, "session evicted");
            }
        }

        sessions.appends += 1;
        let seq = sessions.appends;
        let entry = sessions.by_id.entry(session).or_default();
        entry.devices.push(device);
        entry.last_append = seq;
        debug!(%session, stored = entry.devices.len(), "device appended");
        Ok(entry.devices.len())
    }

    /// Copy of the session's devices in submission order.
    pub fn snapshot(&self, session: SessionId) -> Vec<ElectroDevice> {
        self.sessions
            .read()
            .by_id
            .get(&session)
            .map(|s| s.devices.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, session: SessionId) -> usize {
        self.sessions
            .read()
            .by_id
            .get(&session)
            .map_or(0, |s| s.devices.len())
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.sessions.read().by_id.contains_key(&session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().by_id.len()
    }

    pub fn max_devices_per_session(&self) -> usize {
        self.max_devices_per_session
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn device(name: &str) -> ElectroDevice {
        ElectroDevice::new(name, 0.9, 0.8, 380.0, 1, 10, 0.5, 0.5)
    }

    #[test]
    fn test_append_preserves_order() {
        let registry = DeviceRegistry::new(10, 10);
        let session = SessionId::new();

        assert_eq!(registry.append(session, device("a")).unwrap(), 1);
        assert_eq!(registry.append(session, device("b")).unwrap(), 2);

        let names: Vec<_> = registry
            .snapshot(session)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = DeviceRegistry::new(10, 10);
        let first = SessionId::new();
        let second = SessionId::new();

        registry.append(first, device("a")).unwrap();

        assert_eq!(registry.len(first), 1);
        assert_eq!(registry.len(second), 0);
        assert!(registry.snapshot(second).is_empty());
        assert!(!registry.contains(second));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_limit_is_enforced() {
        let registry = DeviceRegistry::new(2, 10);
        let session = SessionId::new();
        registry.append(session, device("a")).unwrap();
        registry.append(session, device("b")).unwrap();

        assert_eq!(
            registry.append(session, device("c")),
            Err(RegistryError::Full { limit: 2 })
        );
        assert_eq!(registry.len(session), 2);
    }

    #[test]
    fn test_rejected_append_creates_no_session() {
        let registry = DeviceRegistry::new(0, 10);
        for _ in 0..3 {
            assert_eq!(
                registry.append(SessionId::new(), device("a")),
                Err(RegistryError::Full { limit: 0 })
            );
        }
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_session_count_is_bounded() {
        let registry = DeviceRegistry::new(10, 3);
        for i in 0..100 {
            registry
                .append(SessionId::new(), device(&i.to_string()))
                .unwrap();
        }
        assert_eq!(registry.session_count(), 3);
    }

    #[test]
    fn test_least_recently_appended_session_is_evicted() {
        let registry = DeviceRegistry::new(10, 2);
        let first = SessionId::new();
        let second = SessionId::new();
        let third = SessionId::new();

        registry.append(first, device("a")).unwrap();
        registry.append(second, device("b")).unwrap();
        // touching `first` again makes `second` the oldest
        registry.append(first, device("c")).unwrap();
        registry.append(third, device("d")).unwrap();

        assert!(registry.contains(first));
        assert!(!registry.contains(second));
        assert!(registry.contains(third));
        assert_eq!(registry.len(first), 2);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let registry = Arc::new(DeviceRegistry::new(1000, 10));
        let session = SessionId::new();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry
                            .append(session, device(&format!("{}-{}", t, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(session), 400);
    }

    #[test]
    fn test_session_id_round_trips_through_text() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
