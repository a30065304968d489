//! Connection health of live-view sessions

use bvision_signaling::{PeerConnectionState, SessionPhase, SessionSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Sessions still negotiating after this long count as degraded
pub const DEFAULT_NEGOTIATION_BUDGET: Duration = Duration::from_secs(30);

/// Connection information for one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Device key
    pub device_key: String,
    /// Live session id
    pub session_id: Option<String>,
    /// Connection state
    pub state: PeerConnectionState,
    /// Time since the session was started
    pub age: Option<Duration>,
    /// Remote candidates waiting for the answer
    pub pending_remote_candidates: usize,
    /// Whether a session is starting or live
    pub active: bool,
}

impl ConnectionInfo {
    /// Build from a manager snapshot. Returns `None` for a manager that never
    /// started a session.
    pub fn from_snapshot(snapshot: &SessionSnapshot, now: DateTime<Utc>) -> Option<Self> {
        let device_key = snapshot.device_key.clone()?;
        let age = snapshot
            .started_at
            .and_then(|started| now.signed_duration_since(started).to_std().ok());
        Some(Self {
            device_key,
            session_id: snapshot.session_id.as_ref().map(|id| id.to_string()),
            state: snapshot.state,
            age,
            pending_remote_candidates: snapshot.pending_remote_candidates,
            active: snapshot.phase != SessionPhase::Idle,
        })
    }
}

/// Aggregate view over all tiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Tiles considered
    pub total: usize,
    /// Tiles per connection state
    pub by_state: BTreeMap<String, usize>,
    /// Device keys of tiles that need operator attention
    pub degraded: Vec<String>,
}

impl HealthSummary {
    /// Tiles in `state`
    pub fn count(&self, state: PeerConnectionState) -> usize {
        self.by_state.get(state.as_str()).copied().unwrap_or(0)
    }

    /// No degraded tiles
    pub fn is_healthy(&self) -> bool {
        self.degraded.is_empty()
    }

    /// Serialize for a debug overlay
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Classifies tiles as healthy or degraded
#[derive(Debug, Clone)]
pub struct ConnectionAnalyzer {
    negotiation_budget: Duration,
}

impl Default for ConnectionAnalyzer {
    fn default() -> Self {
        Self {
            negotiation_budget: DEFAULT_NEGOTIATION_BUDGET,
        }
    }
}

impl ConnectionAnalyzer {
    /// Analyzer with the default negotiation budget
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how long negotiation may take before a tile is degraded
    pub fn with_negotiation_budget(mut self, budget: Duration) -> Self {
        self.negotiation_budget = budget;
        self
    }

    /// Whether `info` needs attention
    pub fn is_degraded(&self, info: &ConnectionInfo) -> bool {
        match info.state {
            PeerConnectionState::Disconnected | PeerConnectionState::Failed => true,
            PeerConnectionState::New | PeerConnectionState::Connecting => {
                info.active && info.age.is_some_and(|age| age >= self.negotiation_budget)
            }
            PeerConnectionState::Connected | PeerConnectionState::Closed => false,
        }
    }

    /// Summarize snapshots taken at `now`
    pub fn summarize<'a, I>(&self, snapshots: I, now: DateTime<Utc>) -> HealthSummary
    where
        I: IntoIterator<Item = &'a SessionSnapshot>,
    {
        let mut summary = HealthSummary::default();
        for info in snapshots
            .into_iter()
            .filter_map(|s| ConnectionInfo::from_snapshot(s, now))
        {
            summary.total += 1;
            *summary
                .by_state
                .entry(info.state.as_str().to_string())
                .or_default() += 1;
            if self.is_degraded(&info) {
                tracing::debug!("Tile {} degraded in state {}", info.device_key, info.state);
                summary.degraded.push(info.device_key);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvision_signaling::SessionId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(key: &str, state: PeerConnectionState, started_secs_ago: i64) -> SessionSnapshot {
        SessionSnapshot {
            device_key: Some(key.to_string()),
            session_id: Some(SessionId::from(format!("sid-{key}"))),
            phase: if state == PeerConnectionState::Closed {
                SessionPhase::Idle
            } else {
                SessionPhase::Active
            },
            state,
            started_at: Some(now() - chrono::Duration::seconds(started_secs_ago)),
            pending_remote_candidates: 0,
        }
    }

    #[test]
    fn test_summary_counts_and_degraded() {
        let snapshots = vec![
            snapshot("a", PeerConnectionState::Connected, 300),
            snapshot("b", PeerConnectionState::Failed, 60),
            snapshot("c", PeerConnectionState::Connecting, 5),
            snapshot("d", PeerConnectionState::Connecting, 45),
            snapshot("e", PeerConnectionState::Closed, 90),
        ];
        let summary = ConnectionAnalyzer::new().summarize(&snapshots, now());

        assert_eq!(summary.total, 5);
        assert_eq!(summary.count(PeerConnectionState::Connecting), 2);
        assert_eq!(summary.count(PeerConnectionState::Disconnected), 0);
        assert_eq!(summary.degraded, vec!["b".to_string(), "d".to_string()]);
        assert!(!summary.is_healthy());
    }

    #[test]
    fn test_never_started_manager_skipped() {
        let idle = SessionSnapshot {
            device_key: None,
            session_id: None,
            phase: SessionPhase::Idle,
            state: PeerConnectionState::New,
            started_at: None,
            pending_remote_candidates: 0,
        };
        assert!(ConnectionInfo::from_snapshot(&idle, now()).is_none());
        assert_eq!(ConnectionAnalyzer::new().summarize([&idle], now()).total, 0);
    }

    #[test]
    fn test_custom_budget() {
        let analyzer = ConnectionAnalyzer::new().with_negotiation_budget(Duration::from_secs(2));
        let info =
            ConnectionInfo::from_snapshot(&snapshot("c", PeerConnectionState::New, 3), now())
                .unwrap();
        assert_eq!(info.age, Some(Duration::from_secs(3)));
        assert!(analyzer.is_degraded(&info));
    }

    #[test]
    fn test_summary_json() {
        let summary =
            ConnectionAnalyzer::new()
                .summarize(&[snapshot("a", PeerConnectionState::Connected, 1)], now());
        let value: serde_json::Value = serde_json::from_str(&summary.to_json()).unwrap();
        assert_eq!(value["by_state"]["connected"], 1);
        assert!(summary.is_healthy());
    }
}
