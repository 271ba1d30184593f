/// Read preference: which members an operation may be routed to
use crate::core::Member;
use crate::error::{RutaError, RutaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lower bound accepted for `max_staleness`
pub const SMALLEST_MAX_STALENESS: Duration = Duration::from_secs(90);

/// Read preference mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl Mode {
    /// Name sent to routers in the routing document
    pub fn wire_name(&self) -> &'static str {
        match self {
            Mode::Primary => "primary",
            Mode::PrimaryPreferred => "primaryPreferred",
            Mode::Secondary => "secondary",
            Mode::SecondaryPreferred => "secondaryPreferred",
            Mode::Nearest => "nearest",
        }
    }

    /// Whether non-primary members may ever serve this mode
    pub fn slave_ok(&self) -> bool {
        !matches!(self, Mode::Primary)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Mode {
    type Err = RutaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Mode::Primary),
            "primaryPreferred" | "primary_preferred" => Ok(Mode::PrimaryPreferred),
            "secondary" => Ok(Mode::Secondary),
            "secondaryPreferred" | "secondary_preferred" => Ok(Mode::SecondaryPreferred),
            "nearest" => Ok(Mode::Nearest),
            other => Err(RutaError::invalid_read_preference(format!(
                "unknown mode '{}'",
                other
            ))),
        }
    }
}

/// Required key/value labels; an empty set matches every member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the member carries every pair of this set
    pub fn matches(&self, member: &Member) -> bool {
        self.0
            .iter()
            .all(|(key, value)| member.tags.get(key) == Some(value))
    }

    pub fn to_document(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TagSet(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl FromStr for TagSet {
    type Err = RutaError;

    /// Parses `dc=east,rack=1`; the empty string yields the match-any set
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::utils::parse_pairs(s)
            .map(|pairs| pairs.into_iter().collect())
            .map_err(RutaError::invalid_read_preference)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Validated selection policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPreference {
    mode: Mode,
    tag_sets: Vec<TagSet>,
    max_staleness: Option<Duration>,
}

impl ReadPreference {
    /// Build a read preference, rejecting combinations the mode does not allow
    pub fn new(
        mode: Mode,
        tag_sets: Vec<TagSet>,
        max_staleness: Option<Duration>,
    ) -> RutaResult<Self> {
        if mode == Mode::Primary {
            if tag_sets.iter().any(|tag_set| !tag_set.is_empty()) {
                return Err(RutaError::invalid_read_preference(
                    "mode primary cannot be combined with tag sets",
                ));
            }
            if max_staleness.is_some() {
                return Err(RutaError::invalid_read_preference(
                    "mode primary cannot be combined with max staleness",
                ));
            }
        }

        if let Some(max) = max_staleness {
            if max < SMALLEST_MAX_STALENESS {
                return Err(RutaError::invalid_read_preference(format!(
                    "max staleness {}s is below the minimum of {}s",
                    max.as_secs(),
                    SMALLEST_MAX_STALENESS.as_secs()
                )));
            }
        }

        Ok(Self {
            mode,
            tag_sets,
            max_staleness,
        })
    }

    pub fn primary() -> Self {
        Self::bare(Mode::Primary)
    }

    pub fn primary_preferred() -> Self {
        Self::bare(Mode::PrimaryPreferred)
    }

    pub fn secondary() -> Self {
        Self::bare(Mode::Secondary)
    }

    pub fn secondary_preferred() -> Self {
        Self::bare(Mode::SecondaryPreferred)
    }

    pub fn nearest() -> Self {
        Self::bare(Mode::Nearest)
    }

    fn bare(mode: Mode) -> Self {
        Self {
            mode,
            tag_sets: Vec::new(),
            max_staleness: None,
        }
    }

    pub fn with_tag_sets(self, tag_sets: Vec<TagSet>) -> RutaResult<Self> {
        Self::new(self.mode, tag_sets, self.max_staleness)
    }

    pub fn with_max_staleness(self, max_staleness: Duration) -> RutaResult<Self> {
        Self::new(self.mode, self.tag_sets, Some(max_staleness))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tag_sets(&self) -> &[TagSet] {
        &self.tag_sets
    }

    pub fn max_staleness(&self) -> Option<Duration> {
        self.max_staleness
    }

    pub fn slave_ok(&self) -> bool {
        self.mode.slave_ok()
    }

    /// Form forwarded to a router that selects on the client's behalf
    pub fn to_routing_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("mode".to_string(), Value::String(self.mode.wire_name().to_string()));
        // A list of only empty tag sets matches anything and is left out
        if self.tag_sets.iter().any(|tag_set| !tag_set.is_empty()) {
            doc.insert(
                "tags".to_string(),
                Value::Array(self.tag_sets.iter().map(TagSet::to_document).collect()),
            );
        }
        if let Some(max) = self.max_staleness {
            doc.insert("maxStalenessSeconds".to_string(), Value::from(max.as_secs()));
        }
        Value::Object(doc)
    }
}

impl Default for ReadPreference {
    fn default() -> Self {
        Self::primary()
    }
}

impl fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode)?;
        if !self.tag_sets.is_empty() {
            let sets: Vec<String> = self.tag_sets.iter().map(ToString::to_string).collect();
            write!(f, " tags=[{}]", sets.join(", "))?;
        }
        if let Some(max) = self.max_staleness {
            write!(f, " maxStalenessSeconds={}", max.as_secs())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServerRole;
    use serde_json::json;

    fn east() -> TagSet {
        [("dc", "east")].into_iter().collect()
    }

    #[test]
    fn test_mode_names() {
        let modes = [
            (Mode::Primary, "primary", false),
            (Mode::PrimaryPreferred, "primaryPreferred", true),
            (Mode::Secondary, "secondary", true),
            (Mode::SecondaryPreferred, "secondaryPreferred", true),
            (Mode::Nearest, "nearest", true),
        ];
        for (mode, name, slave_ok) in modes {
            assert_eq!(mode.wire_name(), name);
            assert_eq!(mode.slave_ok(), slave_ok);
            assert_eq!(name.parse::<Mode>().unwrap(), mode);
        }
        assert_eq!("secondary_preferred".parse::<Mode>().unwrap(), Mode::SecondaryPreferred);
        assert!("closest".parse::<Mode>().is_err());
    }

    #[test]
    fn test_primary_rejects_tag_sets() {
        let result = ReadPreference::new(Mode::Primary, vec![east()], None);
        assert!(matches!(result, Err(RutaError::InvalidReadPreference { .. })));
    }

    #[test]
    fn test_primary_accepts_match_any_tag_set() {
        let pref = ReadPreference::new(Mode::Primary, vec![TagSet::new()], None).unwrap();
        assert_eq!(pref.tag_sets().len(), 1);
    }

    #[test]
    fn test_primary_rejects_max_staleness() {
        let result = ReadPreference::primary().with_max_staleness(Duration::from_secs(120));
        assert!(matches!(result, Err(RutaError::InvalidReadPreference { .. })));
    }

    #[test]
    fn test_max_staleness_lower_bound() {
        assert!(ReadPreference::secondary()
            .with_max_staleness(Duration::from_secs(89))
            .is_err());
        let pref = ReadPreference::secondary()
            .with_max_staleness(SMALLEST_MAX_STALENESS)
            .unwrap();
        assert_eq!(pref.max_staleness(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_slave_ok() {
        assert!(!ReadPreference::primary().slave_ok());
        assert!(ReadPreference::nearest().slave_ok());
        assert!(ReadPreference::secondary_preferred().slave_ok());
    }

    #[test]
    fn test_routing_document_without_tags() {
        assert_eq!(
            ReadPreference::nearest().to_routing_document(),
            json!({ "mode": "nearest" })
        );
        assert_eq!(
            ReadPreference::primary_preferred().to_routing_document(),
            json!({ "mode": "primaryPreferred" })
        );
    }

    #[test]
    fn test_routing_document_with_tags() {
        let pref = ReadPreference::nearest().with_tag_sets(vec![east()]).unwrap();
        assert_eq!(
            pref.to_routing_document(),
            json!({ "mode": "nearest", "tags": [{ "dc": "east" }] })
        );
    }

    #[test]
    fn test_routing_document_omits_match_any_tags() {
        let pref = ReadPreference::new(Mode::Primary, vec![TagSet::new()], None).unwrap();
        assert_eq!(pref.to_routing_document(), json!({ "mode": "primary" }));

        let pref = ReadPreference::secondary()
            .with_tag_sets(vec![east(), TagSet::new()])
            .unwrap();
        assert_eq!(
            pref.to_routing_document(),
            json!({ "mode": "secondary", "tags": [{ "dc": "east" }, {}] })
        );
    }

    #[test]
    fn test_routing_document_with_max_staleness() {
        let pref = ReadPreference::secondary()
            .with_max_staleness(Duration::from_secs(120))
            .unwrap();
        assert_eq!(
            pref.to_routing_document(),
            json!({ "mode": "secondary", "maxStalenessSeconds": 120 })
        );
    }

    #[test]
    fn test_tag_set_matching() {
        let member = Member::new("a", 1, ServerRole::Secondary, Duration::ZERO)
            .with_tags([("dc", "east"), ("rack", "1")]);

        assert!(east().matches(&member));
        assert!(TagSet::new().matches(&member));
        let west: TagSet = [("dc", "west")].into_iter().collect();
        assert!(!west.matches(&member));
        let more: TagSet = [("dc", "east"), ("disk", "ssd")].into_iter().collect();
        assert!(!more.matches(&member));
    }

    #[test]
    fn test_tag_set_parse_and_display() {
        let tag_set: TagSet = "dc=east,rack=1".parse().unwrap();
        assert_eq!(tag_set.to_string(), "{dc: east, rack: 1}");
        assert!("".parse::<TagSet>().unwrap().is_empty());
        assert!("dc".parse::<TagSet>().is_err());
    }

    #[test]
    fn test_display() {
        let pref = ReadPreference::secondary().with_tag_sets(vec![east(), TagSet::new()]).unwrap();
        assert_eq!(pref.to_string(), "secondary tags=[{dc: east}, {}]");
    }
}
