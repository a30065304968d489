//! Device liveness derived from heartbeats

use crate::model::Device;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A device is online while its last heartbeat is younger than this
pub const HEARTBEAT_FRESHNESS: Duration = Duration::from_secs(60);

/// Reachability of a device, recomputed on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Heartbeat within the freshness window
    Online,
    /// Heartbeat missing, unparsable or stale
    Offline,
}

impl DeviceStatus {
    /// Lowercase label used by the dashboard
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a heartbeat timestamp.
///
/// Accepts RFC 3339 and offset-less ISO 8601 (read as UTC).
pub fn parse_heartbeat(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Status for a heartbeat observed at `now`
pub fn status_at(last_heartbeat: Option<&str>, now: DateTime<Utc>) -> DeviceStatus {
    let Some(heartbeat) = last_heartbeat.and_then(parse_heartbeat) else {
        return DeviceStatus::Offline;
    };
    let age_ms = now.signed_duration_since(heartbeat).num_milliseconds();
    if age_ms < HEARTBEAT_FRESHNESS.as_millis() as i64 {
        DeviceStatus::Online
    } else {
        DeviceStatus::Offline
    }
}

impl Device {
    /// Current status as seen at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> DeviceStatus {
        status_at(self.last_heartbeat.as_deref(), now)
    }

    /// Current status using the system clock
    pub fn status(&self) -> DeviceStatus {
        self.status_at(Utc::now())
    }

    /// Whether the device is online at `now`
    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == DeviceStatus::Online
    }

    /// Key addressing the device on the signaling relay
    pub fn signaling_key(&self) -> &str {
        if self.key.is_empty() {
            &self.id
        } else {
            &self.key
        }
    }
}

/// Devices whose heartbeat is fresh at `now`, in input order
pub fn online_devices(devices: &[Device], now: DateTime<Utc>) -> Vec<&Device> {
    devices.iter().filter(|d| d.is_online_at(now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn device(key: &str, heartbeat: Option<DateTime<Utc>>) -> Device {
        Device {
            id: format!("id-{key}"),
            key: key.to_string(),
            name: key.to_uppercase(),
            last_heartbeat: heartbeat.map(|t| t.to_rfc3339()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_heartbeat_is_online() {
        let hb = now() - chrono::Duration::milliseconds(59_999);
        assert_eq!(status_at(Some(&hb.to_rfc3339()), now()), DeviceStatus::Online);
    }

    #[test]
    fn test_boundary_is_offline() {
        let hb = now() - chrono::Duration::milliseconds(60_000);
        assert_eq!(status_at(Some(&hb.to_rfc3339()), now()), DeviceStatus::Offline);
    }

    #[test]
    fn test_missing_or_garbage_heartbeat_is_offline() {
        assert_eq!(status_at(None, now()), DeviceStatus::Offline);
        assert_eq!(status_at(Some("not a date"), now()), DeviceStatus::Offline);
        assert_eq!(status_at(Some(""), now()), DeviceStatus::Offline);
    }

    #[test]
    fn test_naive_timestamp_read_as_utc() {
        assert_eq!(
            status_at(Some("2024-01-01T11:59:30"), now()),
            DeviceStatus::Online
        );
        assert_eq!(
            parse_heartbeat("2024-01-01T11:59:30.250"),
            Some(
                Utc.with_ymd_and_hms(2024, 1, 1, 11, 59, 30).unwrap()
                    + chrono::Duration::milliseconds(250)
            )
        );
    }

    #[test]
    fn test_online_filter() {
        let devices = vec![
            device("a", Some(now())),
            device("b", Some(now() - chrono::Duration::milliseconds(120_000))),
        ];
        let keys: Vec<&str> = online_devices(&devices, now())
            .into_iter()
            .map(|d| d.key.as_str())
            .collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_signaling_key_falls_back_to_id() {
        let mut d = device("cam", None);
        assert_eq!(d.signaling_key(), "cam");
        d.key.clear();
        assert_eq!(d.signaling_key(), "id-cam");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(DeviceStatus::Online.to_string(), "online");
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Offline).unwrap(),
            "\"offline\""
        );
    }
}
