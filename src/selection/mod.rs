/// Server selection engine
///
/// Turns a topology snapshot and a read preference into the set of members
/// eligible to serve an operation. Selection runs in three phases:
/// - role filter driven by the read preference mode
/// - tag filter, first matching tag set wins
/// - latency window around the fastest survivor
///
/// The engine is a pure function over immutable input. Picking one member out
/// of the eligible set and waiting for a better topology live in [`balancer`]
/// and [`wait`], on the executor's side of the boundary.
pub mod balancer;
pub mod read_preference;
pub mod wait;

pub use read_preference::{Mode, ReadPreference, TagSet, SMALLEST_MAX_STALENESS};

use crate::config::SelectionConfig;
use crate::core::{Member, ServerRole, TopologyKind, TopologySnapshot};
use std::time::Duration;

/// Capability of a policy to filter a snapshot down to eligible members
pub trait Selectable {
    /// Eligible members; order is not meaningful and duplicates are preserved
    fn select<'a>(&self, snapshot: &'a TopologySnapshot, local_threshold: Duration) -> Vec<&'a Member>;
}

impl Selectable for ReadPreference {
    fn select<'a>(&self, snapshot: &'a TopologySnapshot, local_threshold: Duration) -> Vec<&'a Member> {
        let reachable: Vec<&Member> = snapshot.members().iter().filter(|m| m.reachable).collect();

        match snapshot.kind() {
            // Routers and standalones select (or ignore) on their own; the mode
            // only travels onward in the routing document.
            TopologyKind::Single | TopologyKind::Sharded => {
                within_latency_window(reachable, local_threshold)
            }
            TopologyKind::ReplicaSet => select_replica_set(self, reachable, local_threshold),
        }
    }
}

fn select_replica_set<'a>(
    preference: &ReadPreference,
    candidates: Vec<&'a Member>,
    local_threshold: Duration,
) -> Vec<&'a Member> {
    match preference.mode() {
        Mode::Primary => with_role(&candidates, ServerRole::Primary),
        Mode::PrimaryPreferred => {
            let primary = with_role(&candidates, ServerRole::Primary);
            if primary.is_empty() {
                select_secondaries(preference, &candidates, local_threshold)
            } else {
                primary
            }
        }
        Mode::Secondary => select_secondaries(preference, &candidates, local_threshold),
        Mode::SecondaryPreferred => {
            if with_role(&candidates, ServerRole::Secondary).is_empty() {
                // Fallback primary is accepted without tag filtering
                with_role(&candidates, ServerRole::Primary)
            } else {
                select_secondaries(preference, &candidates, local_threshold)
            }
        }
        Mode::Nearest => {
            let data_bearing: Vec<&Member> = candidates
                .iter()
                .copied()
                .filter(|m| matches!(m.role, ServerRole::Primary | ServerRole::Secondary))
                .collect();
            let fresh = filter_by_staleness(data_bearing, preference.max_staleness());
            let tagged = filter_by_tag_sets(fresh, preference.tag_sets());
            within_latency_window(tagged, local_threshold)
        }
    }
}

fn select_secondaries<'a>(
    preference: &ReadPreference,
    candidates: &[&'a Member],
    local_threshold: Duration,
) -> Vec<&'a Member> {
    let secondaries = with_role(candidates, ServerRole::Secondary);
    let fresh = filter_by_staleness(secondaries, preference.max_staleness());
    let tagged = filter_by_tag_sets(fresh, preference.tag_sets());
    within_latency_window(tagged, local_threshold)
}

fn with_role<'a>(candidates: &[&'a Member], role: ServerRole) -> Vec<&'a Member> {
    candidates.iter().copied().filter(|m| m.role == role).collect()
}

/// Drop non-primary members known to lag further than `max_staleness`
///
/// Members whose staleness the monitor has not estimated are kept.
pub fn filter_by_staleness<'a>(candidates: Vec<&'a Member>, max_staleness: Option<Duration>) -> Vec<&'a Member> {
    let Some(max) = max_staleness else {
        return candidates;
    };
    candidates
        .into_iter()
        .filter(|m| m.is_primary() || m.staleness.map_or(true, |lag| lag <= max))
        .collect()
}

/// Keep the members matching the first tag set that matches anyone
pub fn filter_by_tag_sets<'a>(candidates: Vec<&'a Member>, tag_sets: &[TagSet]) -> Vec<&'a Member> {
    if tag_sets.is_empty() {
        return candidates;
    }

    for tag_set in tag_sets {
        let matching: Vec<&Member> = candidates
            .iter()
            .copied()
            .filter(|m| tag_set.matches(m))
            .collect();
        if !matching.is_empty() {
            return matching;
        }
    }

    Vec::new()
}

/// Keep members within `window` of the fastest candidate, boundary included
pub fn within_latency_window<'a>(candidates: Vec<&'a Member>, window: Duration) -> Vec<&'a Member> {
    let Some(fastest) = candidates.iter().map(|m| m.round_trip_time).min() else {
        return candidates;
    };
    let ceiling = fastest.saturating_add(window);
    candidates
        .into_iter()
        .filter(|m| m.round_trip_time <= ceiling)
        .collect()
}

/// The engine: a selection policy applied with a fixed latency window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSelector {
    local_threshold: Duration,
}

impl ServerSelector {
    pub const DEFAULT_LOCAL_THRESHOLD: Duration = Duration::from_millis(15);

    pub fn new(local_threshold: Duration) -> Self {
        Self { local_threshold }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.local_threshold())
    }

    pub fn local_threshold(&self) -> Duration {
        self.local_threshold
    }

    /// Eligible members of `snapshot` under `preference`
    ///
    /// An empty result is not an error; deciding when to give up is the caller's job.
    pub fn select<'a, S>(&self, snapshot: &'a TopologySnapshot, preference: &S) -> Vec<&'a Member>
    where
        S: Selectable + ?Sized,
    {
        let eligible = preference.select(snapshot, self.local_threshold);
        log::debug!(
            "Selection over {} {} members yielded {} eligible",
            snapshot.members().len(),
            snapshot.kind(),
            eligible.len()
        );
        eligible
    }
}

impl Default for ServerSelector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOCAL_THRESHOLD)
    }
}
