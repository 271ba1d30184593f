/// Topology snapshots and their copy-on-write publication
use crate::core::{Member, ServerRole};
use crate::error::{RutaError, RutaResult};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Shape of the deployment a snapshot describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    Single,
    ReplicaSet,
    Sharded,
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopologyKind::Single => "single",
            TopologyKind::ReplicaSet => "replica_set",
            TopologyKind::Sharded => "sharded",
        };
        f.write_str(name)
    }
}

/// Immutable point-in-time view of every known member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologySnapshot {
    kind: TopologyKind,
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    kind: TopologyKind,
    #[serde(default)]
    members: Vec<Member>,
}

impl TopologySnapshot {
    /// Build a snapshot, enforcing the single-primary rule for replica sets
    pub fn new(kind: TopologyKind, members: Vec<Member>) -> RutaResult<Self> {
        if kind == TopologyKind::ReplicaSet {
            let primaries: Vec<String> = members
                .iter()
                .filter(|m| m.role == ServerRole::Primary)
                .map(Member::address)
                .collect();
            if primaries.len() > 1 {
                return Err(RutaError::invalid_topology(format!(
                    "replica set snapshot has {} primaries: {}",
                    primaries.len(),
                    primaries.join(", ")
                )));
            }
        }

        Ok(Self { kind, members })
    }

    pub fn empty(kind: TopologyKind) -> Self {
        Self {
            kind,
            members: Vec::new(),
        }
    }

    /// Parse a snapshot from its TOML description
    pub fn from_toml_str(content: &str) -> RutaResult<Self> {
        let file: SnapshotFile =
            toml::from_str(content).map_err(|e| RutaError::serialization(e.to_string()))?;
        Self::new(file.kind, file.members)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> RutaResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn primary(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.is_primary() && m.reachable)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Cloneable handle to the current snapshot
///
/// The monitor publishes a fresh snapshot; readers always see either the old
/// one or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct TopologyHandle {
    current: Arc<ArcSwap<TopologySnapshot>>,
    changed: Arc<Notify>,
}

impl TopologyHandle {
    pub fn new(initial: TopologySnapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
            changed: Arc::new(Notify::new()),
        }
    }

    /// Current snapshot; stays valid for as long as the caller holds it
    pub fn load(&self) -> Arc<TopologySnapshot> {
        self.current.load_full()
    }

    /// Atomically replace the current snapshot and wake selection waiters
    pub fn publish(&self, snapshot: TopologySnapshot) -> Arc<TopologySnapshot> {
        log::debug!(
            "Publishing {} topology with {} members",
            snapshot.kind(),
            snapshot.members().len()
        );
        let previous = self.current.swap(Arc::new(snapshot));
        self.changed.notify_waiters();
        previous
    }

    /// Future resolving on the next publish
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn member(port: u16, role: ServerRole) -> Member {
        Member::new("127.0.0.1", port, role, Duration::from_millis(5))
    }

    #[test]
    fn test_replica_set_rejects_two_primaries() {
        let result = TopologySnapshot::new(
            TopologyKind::ReplicaSet,
            vec![member(27017, ServerRole::Primary), member(27018, ServerRole::Primary)],
        );
        assert!(matches!(result, Err(RutaError::InvalidTopology { .. })));
    }

    #[test]
    fn test_sharded_allows_any_roles() {
        let snapshot = TopologySnapshot::new(
            TopologyKind::Sharded,
            vec![member(27017, ServerRole::Router), member(27018, ServerRole::Router)],
        )
        .unwrap();
        assert_eq!(snapshot.members().len(), 2);
        assert!(snapshot.primary().is_none());
    }

    #[test]
    fn test_from_toml() {
        let snapshot = TopologySnapshot::from_toml_str(
            r#"
            kind = "replica_set"

            [[members]]
            host = "10.0.0.1"
            port = 27017
            role = "primary"
            round_trip_time_ms = 10

            [[members]]
            host = "10.0.0.2"
            port = 27017
            role = "secondary"
            round_trip_time_ms = 12
            tags = { dc = "east" }
            "#,
        )
        .unwrap();

        assert_eq!(snapshot.kind(), TopologyKind::ReplicaSet);
        assert_eq!(snapshot.primary().map(Member::address), Some("10.0.0.1:27017".to_string()));
        assert_eq!(snapshot.members()[1].tags.get("dc").map(String::as_str), Some("east"));
    }

    #[test]
    fn test_from_toml_bad_kind() {
        let result = TopologySnapshot::from_toml_str("kind = \"mesh\"");
        assert!(matches!(result, Err(RutaError::Serialization(_))));
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let handle = TopologyHandle::new(TopologySnapshot::empty(TopologyKind::ReplicaSet));
        let before = handle.load();
        assert!(before.is_empty());

        let next = TopologySnapshot::new(
            TopologyKind::ReplicaSet,
            vec![member(27017, ServerRole::Primary)],
        )
        .unwrap();
        let previous = handle.publish(next);

        assert!(previous.is_empty());
        // The reader's earlier view is untouched by the publish
        assert!(before.is_empty());
        assert_eq!(handle.load().members().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_wakes_waiters() {
        let handle = TopologyHandle::new(TopologySnapshot::empty(TopologyKind::Single));
        let waiter = handle.clone();

        let task = tokio::spawn(async move {
            let changed = waiter.changed();
            tokio::pin!(changed);
            changed.as_mut().enable();
            changed.await;
            waiter.load().members().len()
        });

        // Keep publishing until the spawned waiter has registered and observed one
        let mut port = 27017;
        while !task.is_finished() {
            handle.publish(
                TopologySnapshot::new(TopologyKind::Single, vec![member(port, ServerRole::Standalone)])
                    .unwrap(),
            );
            port += 1;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(task.await.unwrap(), 1);
    }
}
