//! Dashboard overview: headline counts and the device table

use bvision_api::{ApiClient, DeviceSource, RecordingSource};
use bvision_core::{BVisionError, Device, DeviceStatus, Site};
use chrono::{DateTime, Utc};
use std::fmt;

/// Filter tab above the device table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceTab {
    /// Every device
    #[default]
    All,
    /// Fresh heartbeat only
    Online,
    /// Stale or missing heartbeat only
    Offline,
}

impl DeviceTab {
    /// Tabs in display order
    pub const ALL: [DeviceTab; 3] = [DeviceTab::All, DeviceTab::Online, DeviceTab::Offline];

    /// Whether a device with `status` is listed under this tab
    pub fn matches(&self, status: DeviceStatus) -> bool {
        match self {
            DeviceTab::All => true,
            DeviceTab::Online => status == DeviceStatus::Online,
            DeviceTab::Offline => status == DeviceStatus::Offline,
        }
    }
}

impl fmt::Display for DeviceTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceTab::All => "All Devices",
            DeviceTab::Online => "Online",
            DeviceTab::Offline => "Offline",
        })
    }
}

/// One row of the device table
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    /// Device id
    pub id: String,
    /// Device name
    pub name: String,
    /// Raw heartbeat timestamp
    pub last_heartbeat: Option<String>,
    /// First reported IP address
    pub ip: Option<String>,
    /// Uptime as reported by the device
    pub uptime: String,
    /// Status at the time the table was built
    pub status: DeviceStatus,
}

/// Rows for `tab`, in input order
pub fn device_rows(devices: &[Device], tab: DeviceTab, now: DateTime<Utc>) -> Vec<DeviceRow> {
    devices
        .iter()
        .filter_map(|d| {
            let status = d.status_at(now);
            tab.matches(status).then(|| DeviceRow {
                id: d.id.clone(),
                name: d.name.clone(),
                last_heartbeat: d.last_heartbeat.clone(),
                ip: d.ips.first().cloned(),
                uptime: d.uptime.clone(),
                status,
            })
        })
        .collect()
}

/// Headline numbers of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbenchSummary {
    /// Devices with a fresh heartbeat
    pub devices_online: usize,
    /// Registered devices
    pub devices_total: usize,
    /// Sites with at least one online device
    pub sites_online: usize,
    /// Registered sites
    pub sites_total: usize,
    /// Stored recordings
    pub recordings_total: u64,
}

impl WorkbenchSummary {
    /// Compute from already fetched records
    pub fn compute(
        devices: &[Device],
        sites: &[Site],
        recordings_total: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let devices_online = devices.iter().filter(|d| d.is_online_at(now)).count();
        let sites_online = sites
            .iter()
            .filter(|s| {
                s.devices
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .any(|d| d.is_online_at(now))
            })
            .count();
        Self {
            devices_online,
            devices_total: devices.len(),
            sites_online,
            sites_total: sites.len(),
            recordings_total,
        }
    }

    /// Fetch devices, sites and the recording count, then compute
    pub async fn load(client: &ApiClient, now: DateTime<Utc>) -> Result<Self, BVisionError> {
        let devices = client.devices().list_devices().await?;
        let sites = client.sites().list().await?;
        let recordings_total = client.recordings().count_recordings().await?;
        Ok(Self::compute(&devices, &sites, recordings_total, now))
    }

    /// `online / total` label of the device tile
    pub fn devices_label(&self) -> String {
        format!("{} / {}", self.devices_online, self.devices_total)
    }

    /// `online / total` label of the site tile
    pub fn sites_label(&self) -> String {
        format!("{} / {}", self.sites_online, self.sites_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn device(name: &str, heartbeat_secs_ago: Option<i64>) -> Device {
        Device {
            id: format!("id-{name}"),
            key: name.to_string(),
            name: name.to_string(),
            last_heartbeat: heartbeat_secs_ago
                .map(|s| (now() - chrono::Duration::seconds(s)).to_rfc3339()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tabs_filter_rows() {
        let devices = vec![
            device("timesquare", Some(5)),
            device("nashville", Some(600)),
            device("depot", None),
        ];
        let names = |tab| -> Vec<String> {
            device_rows(&devices, tab, now())
                .into_iter()
                .map(|r| r.name)
                .collect()
        };
        assert_eq!(names(DeviceTab::All).len(), 3);
        assert_eq!(names(DeviceTab::Online), vec!["timesquare"]);
        assert_eq!(names(DeviceTab::Offline), vec!["nashville", "depot"]);
        assert_eq!(DeviceTab::All.to_string(), "All Devices");
    }

    #[test]
    fn test_summary_counts() {
        let devices = vec![device("a", Some(1)), device("b", Some(120))];
        let sites = vec![
            Site {
                id: "s-1".to_string(),
                name: "North".to_string(),
                devices: Some(vec![device("a", Some(1))]),
                ..Default::default()
            },
            Site {
                id: "s-2".to_string(),
                name: "South".to_string(),
                devices: Some(vec![device("b", Some(120))]),
                ..Default::default()
            },
            Site {
                id: "s-3".to_string(),
                name: "Empty".to_string(),
                ..Default::default()
            },
        ];
        let summary = WorkbenchSummary::compute(&devices, &sites, 150, now());
        assert_eq!(summary.devices_label(), "1 / 2");
        assert_eq!(summary.sites_label(), "1 / 3");
        assert_eq!(summary.recordings_total, 150);
    }
}
