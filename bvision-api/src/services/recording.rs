use super::item_path;
use crate::client::ApiClient;
use async_trait::async_trait;
use bvision_core::{BVisionError, CountRes, Recording};
use chrono::NaiveDate;

/// Recording collection path
pub const RECORDINGS_PATH: &str = "/recordings";

/// Page and filters for the recordings list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Device names to include; empty means all
    pub devices: Vec<String>,
    /// Day to include
    pub date: Option<NaiveDate>,
}

impl Default for RecordingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            devices: Vec::new(),
            date: None,
        }
    }
}

impl RecordingQuery {
    /// Query string pairs; `devices` repeats once per name
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        pairs.extend(self.devices.iter().map(|d| ("devices", d.clone())));
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

/// Read access to stored recordings
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// One page of recordings
    async fn list_recordings(&self, query: &RecordingQuery) -> Result<Vec<Recording>, BVisionError>;

    /// Number of stored recordings
    async fn count_recordings(&self) -> Result<u64, BVisionError>;

    /// One recording by identifier
    async fn recording(&self, id: &str) -> Result<Recording, BVisionError>;
}

/// `/recordings` endpoints
#[derive(Debug, Clone)]
pub struct RecordingService {
    client: ApiClient,
}

impl RecordingService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordingSource for RecordingService {
    async fn list_recordings(
        &self,
        query: &RecordingQuery,
    ) -> Result<Vec<Recording>, BVisionError> {
        self.client
            .get_with_query(RECORDINGS_PATH, &query.to_query_pairs())
            .await
    }

    async fn count_recordings(&self) -> Result<u64, BVisionError> {
        let res: CountRes = self.client.get(&format!("{RECORDINGS_PATH}/count")).await?;
        Ok(res.count)
    }

    async fn recording(&self, id: &str) -> Result<Recording, BVisionError> {
        self.client.get(&item_path(RECORDINGS_PATH, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = RecordingQuery::default();
        assert_eq!(
            query.to_query_pairs(),
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );
    }

    #[test]
    fn test_filters_in_query() {
        let query = RecordingQuery {
            page: 3,
            limit: 10,
            devices: vec!["Lobby".to_string(), "Gate 2".to_string()],
            date: NaiveDate::from_ymd_opt(2024, 1, 5),
        };
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("page", "3".to_string()),
                ("limit", "10".to_string()),
                ("devices", "Lobby".to_string()),
                ("devices", "Gate 2".to_string()),
                ("date", "2024-01-05".to_string()),
            ]
        );
    }
}
