/// Core data model shared by the selection engine and its consumers
pub mod topology;

pub use topology::{TopologyHandle, TopologyKind, TopologySnapshot};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Role a member reported in its last monitor check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    Primary,
    Secondary,
    Arbiter,
    Standalone,
    Router,
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerRole::Primary => "primary",
            ServerRole::Secondary => "secondary",
            ServerRole::Arbiter => "arbiter",
            ServerRole::Standalone => "standalone",
            ServerRole::Router => "router",
        };
        f.write_str(name)
    }
}

/// A cluster member as last described by the monitor
///
/// Members are replaced wholesale on every monitor pass; nothing in this crate
/// mutates one after it has been published in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub host: String,
    pub port: u16,
    pub role: ServerRole,
    /// Exponentially-averaged round trip time
    #[serde(rename = "round_trip_time_ms", with = "crate::utils::duration_ms")]
    pub round_trip_time: Duration,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    /// Estimated replication lag behind the primary, when the monitor knows it
    #[serde(
        default,
        rename = "staleness_ms",
        with = "crate::utils::option_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub staleness: Option<Duration>,
}

fn default_reachable() -> bool {
    true
}

impl Member {
    pub fn new<S: Into<String>>(host: S, port: u16, role: ServerRole, round_trip_time: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            role,
            round_trip_time,
            tags: BTreeMap::new(),
            reachable: true,
            staleness: None,
        }
    }

    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = Some(staleness);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// `host:port` form used in logs and by connection pools
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_primary(&self) -> bool {
        self.role == ServerRole::Primary
    }

    pub fn is_secondary(&self) -> bool {
        self.role == ServerRole::Secondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_builders() {
        let member = Member::new("db1.example.com", 27017, ServerRole::Secondary, Duration::from_millis(12))
            .with_tags([("dc", "east")])
            .with_staleness(Duration::from_secs(5));

        assert_eq!(member.address(), "db1.example.com:27017");
        assert!(member.is_secondary());
        assert!(!member.is_primary());
        assert!(member.reachable);
        assert_eq!(member.tags.get("dc").map(String::as_str), Some("east"));
        assert_eq!(member.staleness, Some(Duration::from_secs(5)));
        assert!(!member.clone().unreachable().reachable);
    }

    #[test]
    fn test_member_deserialize_defaults() {
        let member: Member = toml::from_str(
            r#"
            host = "127.0.0.1"
            port = 27018
            role = "secondary"
            round_trip_time_ms = 12.5
            "#,
        )
        .unwrap();

        assert_eq!(member.round_trip_time, Duration::from_micros(12_500));
        assert!(member.reachable);
        assert!(member.tags.is_empty());
        assert_eq!(member.staleness, None);
    }

    #[test]
    fn test_member_deserialize_rejects_negative_rtt() {
        let result: Result<Member, _> = toml::from_str(
            r#"
            host = "127.0.0.1"
            port = 27018
            role = "primary"
            round_trip_time_ms = -3.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ServerRole::Primary.to_string(), "primary");
        assert_eq!(ServerRole::Router.to_string(), "router");
    }
}
