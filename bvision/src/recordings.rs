//! Recordings browser: paging, filters and card rendering

use bvision_api::{RecordingQuery, RecordingSource};
use bvision_core::{BVisionError, Recording, RecordingCard};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Browser state over a recording source
#[derive(Debug)]
pub struct RecordingsBrowser<S> {
    source: S,
    query: RecordingQuery,
    recordings: Vec<Recording>,
}

impl<S: RecordingSource> RecordingsBrowser<S> {
    /// Start on page 1 with no filters
    pub fn new(source: S) -> Self {
        Self {
            source,
            query: RecordingQuery::default(),
            recordings: Vec::new(),
        }
    }

    /// Current query
    pub fn query(&self) -> &RecordingQuery {
        &self.query
    }

    /// Current 1-based page
    pub fn page(&self) -> u32 {
        self.query.page
    }

    /// Device names currently selected
    pub fn selected_devices(&self) -> &[String] {
        &self.query.devices
    }

    /// Add or remove a device name from the filter. Returns whether it is
    /// now selected. Changing filters goes back to page 1.
    pub fn toggle_device(&mut self, device_name: &str) -> bool {
        let selected = match self.query.devices.iter().position(|d| d == device_name) {
            Some(index) => {
                self.query.devices.remove(index);
                false
            }
            None => {
                self.query.devices.push(device_name.to_string());
                true
            }
        };
        self.query.page = 1;
        selected
    }

    /// Restrict to one day, or clear the day filter with `None`
    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.query.date = date;
        self.query.page = 1;
    }

    /// Date filter from a `YYYY-MM-DD` input value; empty clears it
    pub fn set_date_input(&mut self, value: &str) -> Result<(), BVisionError> {
        let value = value.trim();
        if value.is_empty() {
            self.set_date(None);
            return Ok(());
        }
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            BVisionError::InvalidData {
                reason: format!("{value:?} is not a date: {e}"),
            }
        })?;
        self.set_date(Some(date));
        Ok(())
    }

    /// Drop device and date filters and go back to page 1
    pub fn clear_filters(&mut self) {
        self.query.devices.clear();
        self.query.date = None;
        self.query.page = 1;
    }

    /// Whether "Previous" is enabled
    pub fn has_previous(&self) -> bool {
        self.query.page > 1
    }

    /// Advance one page
    pub fn next_page(&mut self) {
        self.query.page += 1;
    }

    /// Go back one page. Returns `false` on page 1.
    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.query.page -= 1;
        true
    }

    /// Load the page described by the current query
    pub async fn fetch(&mut self) -> Result<&[Recording], BVisionError> {
        debug!(
            "Fetching recordings page {} ({} devices, date {:?})",
            self.query.page,
            self.query.devices.len(),
            self.query.date
        );
        match self.source.list_recordings(&self.query).await {
            Ok(recordings) => {
                self.recordings = recordings;
                Ok(&self.recordings)
            }
            Err(e) => {
                warn!("Failed to load recordings: {}", e);
                Err(e)
            }
        }
    }

    /// Recordings of the last successful fetch
    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    /// Cards for the last fetch; recordings with unusable times are skipped
    pub fn cards(&self) -> Vec<RecordingCard> {
        self.recordings
            .iter()
            .filter_map(|r| match RecordingCard::render(r) {
                Ok(card) => Some(card),
                Err(e) => {
                    warn!("Skipping recording {}: {}", r.id, e);
                    None
                }
            })
            .collect()
    }

    /// `Showing N recording(s) - Page P`
    pub fn summary(&self) -> String {
        let n = self.recordings.len();
        format!(
            "Showing {} recording{} - Page {}",
            n,
            if n == 1 { "" } else { "s" },
            self.query.page
        )
    }
}
