//! Presentation of recording segments

use crate::error::BVisionError;
use crate::model::Recording;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::time::Duration;

/// Display data for one recording in the browser grid
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingCard {
    /// Recording identifier
    pub id: String,
    /// Device name, shown as received
    pub device_name: String,
    /// Month and day of the start, e.g. `January 1`
    pub month_day: String,
    /// Start time as `HH:MM:SS` (24 h)
    pub start: String,
    /// End time as `HH:MM:SS` (24 h)
    pub end: String,
    /// End minus start
    pub duration: Duration,
    /// Playback URL
    pub video_src: String,
}

fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>, BVisionError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BVisionError::InvalidData {
            reason: format!("{field} {raw:?} is not a timestamp: {e}"),
        })
}

impl RecordingCard {
    /// Render in UTC
    pub fn render(recording: &Recording) -> Result<Self, BVisionError> {
        Self::render_in(recording, &Utc.fix())
    }

    /// Render with wall-clock times in `offset`
    pub fn render_in(recording: &Recording, offset: &FixedOffset) -> Result<Self, BVisionError> {
        let start = parse_time("startTime", &recording.start_time)?;
        let end = parse_time("endTime", &recording.end_time)?;
        let duration = end
            .signed_duration_since(start)
            .to_std()
            .map_err(|_| BVisionError::InvalidData {
                reason: format!(
                    "recording {} ends before it starts ({} < {})",
                    recording.id, recording.end_time, recording.start_time
                ),
            })?;

        let local_start = start.with_timezone(offset);
        let local_end = end.with_timezone(offset);
        Ok(Self {
            id: recording.id.clone(),
            device_name: recording.device_name.clone(),
            month_day: local_start.format("%B %-d").to_string(),
            start: local_start.format("%H:%M:%S").to_string(),
            end: local_end.format("%H:%M:%S").to_string(),
            duration,
            video_src: recording.video_src.clone(),
        })
    }

    /// `start - end`
    pub fn time_range(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }

    /// Caption shown under the player
    pub fn caption(&self) -> String {
        format!("{} | {} | {}", self.device_name, self.month_day, self.time_range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(start: &str, end: &str) -> Recording {
        Recording {
            id: "rec-1".to_string(),
            device_name: "Lobby Cam #2".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            duration: 300.0,
            video_src: "https://cdn.example.com/rec-1.mp4".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_card_rendering() {
        let card =
            RecordingCard::render(&recording("2024-01-01T10:00:00Z", "2024-01-01T10:05:00Z"))
                .unwrap();
        assert_eq!(card.month_day, "January 1");
        assert_eq!(card.time_range(), "10:00:00 - 10:05:00");
        assert_eq!(card.duration, Duration::from_secs(300));
        assert_eq!(card.device_name, "Lobby Cam #2");
        assert_eq!(card.caption(), "Lobby Cam #2 | January 1 | 10:00:00 - 10:05:00");
    }

    #[test]
    fn test_card_in_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let card = RecordingCard::render_in(
            &recording("2024-03-31T22:59:00Z", "2024-03-31T23:01:30Z"),
            &offset,
        )
        .unwrap();
        assert_eq!(card.month_day, "April 1");
        assert_eq!(card.start, "00:59:00");
        assert_eq!(card.end, "01:01:30");
        assert_eq!(card.duration, Duration::from_secs(150));
    }

    #[test]
    fn test_invalid_times_rejected() {
        assert!(RecordingCard::render(&recording("yesterday", "2024-01-01T10:05:00Z")).is_err());
        let err =
            RecordingCard::render(&recording("2024-01-01T10:05:00Z", "2024-01-01T10:00:00Z"))
                .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }
}
