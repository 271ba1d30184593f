/// Waiting for a suitable server
///
/// The engine never blocks. This loop sits on the executor's side: it keeps
/// re-running selection against the latest published snapshot until a member
/// turns up or the selection timeout runs out. Dropping the future cancels it.
use crate::config::SelectionConfig;
use crate::core::{Member, TopologyHandle};
use crate::error::{RutaError, RutaResult};
use crate::selection::balancer::PickStrategy;
use crate::selection::{Selectable, ServerSelector};
use std::fmt;
use tokio::time::Instant;

/// Select one member, waiting for topology changes while nothing is eligible
pub async fn select_server<S, P>(
    topology: &TopologyHandle,
    preference: &S,
    picker: &P,
    config: &SelectionConfig,
) -> RutaResult<Member>
where
    S: Selectable + fmt::Display + ?Sized,
    P: PickStrategy + ?Sized,
{
    let selector = ServerSelector::from_config(config);
    let timeout = config.server_selection_timeout();
    let deadline = Instant::now() + timeout;
    let mut attempts: u32 = 0;

    loop {
        // Register before loading so a publish in between is not missed
        let changed = topology.changed();
        tokio::pin!(changed);
        changed.as_mut().enable();

        let snapshot = topology.load();
        let eligible = selector.select(&snapshot, preference);
        attempts += 1;

        if let Some(member) = picker.pick(&eligible).and_then(|i| eligible.get(i)) {
            tracing::debug!(
                address = %member.address(),
                role = %member.role,
                attempts,
                "Selected server for {}",
                preference
            );
            return Ok((*member).clone());
        }

        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "No server available for {} after {} attempts over {:?}",
                preference,
                attempts,
                timeout
            );
            return Err(RutaError::no_server_available(preference.to_string(), timeout));
        }

        let wake_at = (now + config.poll_interval()).min(deadline);
        tokio::select! {
            _ = &mut changed => {
                tracing::trace!("Topology changed, retrying selection");
            }
            _ = tokio::time::sleep_until(wake_at) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ServerRole, TopologyKind, TopologySnapshot};
    use crate::selection::balancer::{RandomPick, RoundRobin};
    use crate::selection::ReadPreference;
    use std::time::Duration;

    fn quick_config() -> SelectionConfig {
        SelectionConfig {
            local_threshold_ms: 15,
            server_selection_timeout_ms: 60,
            poll_interval_ms: 10,
        }
    }

    fn replica_set(members: Vec<Member>) -> TopologySnapshot {
        TopologySnapshot::new(TopologyKind::ReplicaSet, members).unwrap()
    }

    #[tokio::test]
    async fn test_immediate_selection() {
        let primary = Member::new("10.0.0.1", 27017, ServerRole::Primary, Duration::from_millis(3));
        let topology = TopologyHandle::new(replica_set(vec![primary.clone()]));

        let selected = select_server(&topology, &ReadPreference::primary(), &RandomPick::new(), &quick_config())
            .await
            .unwrap();
        assert_eq!(selected, primary);
    }

    #[tokio::test]
    async fn test_times_out_with_no_server_available() {
        let topology = TopologyHandle::new(replica_set(vec![Member::new(
            "10.0.0.2",
            27017,
            ServerRole::Secondary,
            Duration::from_millis(3),
        )]));

        let started = std::time::Instant::now();
        let result = select_server(&topology, &ReadPreference::primary(), &RoundRobin::new(), &quick_config()).await;

        match result {
            Err(RutaError::NoServerAvailable { read_preference, timeout }) => {
                assert_eq!(read_preference, "primary");
                assert_eq!(timeout, Duration::from_millis(60));
            }
            other => panic!("Expected NoServerAvailable, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_picks_up_published_topology() {
        let topology = TopologyHandle::new(TopologySnapshot::empty(TopologyKind::ReplicaSet));
        let config = SelectionConfig {
            local_threshold_ms: 15,
            server_selection_timeout_ms: 5_000,
            poll_interval_ms: 1_000,
        };

        let publisher = topology.clone();
        let secondary = Member::new("10.0.0.3", 27017, ServerRole::Secondary, Duration::from_millis(3));
        let published = secondary.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(replica_set(vec![published]));
        });

        let started = std::time::Instant::now();
        let selected = select_server(&topology, &ReadPreference::secondary_preferred(), &RandomPick::new(), &config)
            .await
            .unwrap();
        assert_eq!(selected, secondary);
        // Woken by the publish rather than the 1s poll interval
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[test]
    fn test_blocking_caller() {
        let standalone = Member::new("localhost", 27017, ServerRole::Standalone, Duration::from_millis(1));
        let topology = TopologyHandle::new(
            TopologySnapshot::new(TopologyKind::Single, vec![standalone.clone()]).unwrap(),
        );

        let selected = tokio_test::block_on(select_server(
            &topology,
            &ReadPreference::nearest(),
            &RoundRobin::new(),
            &quick_config(),
        ))
        .unwrap();
        assert_eq!(selected, standalone);
    }
}
