//! Operator alerting.
//!
//! Alerts are tagged with whatever sample metadata could be read from the
//! delegated task's parameters. Missing or malformed parameters never prevent
//! an alert from being sent; they just yield an empty tag set.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Tag keys attached to operator alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    SampleId,
    Visit,
    Container,
}

impl MetadataKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::SampleId => "sample_id",
            MetadataKey::Visit => "visit",
            MetadataKey::Container => "container",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type AlertMetadata = BTreeMap<MetadataKey, String>;

/// One operator alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub summary: String,
    pub content: String,
    pub metadata: AlertMetadata,
}

impl AlertRecord {
    /// Informational alert: the task is still paused waiting for beam.
    pub(crate) fn waiting_for_beam(task_id: &str, elapsed: Duration, metadata: AlertMetadata) -> Self {
        let minutes = elapsed.as_secs() / 60;
        Self {
            summary: "Unattended data collection paused waiting for beam".to_string(),
            content: format!(
                "Task {task_id} has been waiting for beam for {minutes} minutes."
            ),
            metadata,
        }
    }

    /// Escalation alert: the task made no progress and was cancelled.
    pub(crate) fn stuck(task_id: &str, timeout: Duration, metadata: AlertMetadata) -> Self {
        Self {
            summary: "Unattended data collection stuck".to_string(),
            content: format!(
                "Task {task_id} reported no progress for {}s and is not waiting for beam. \
                 Cancellation has been requested.",
                timeout.as_secs()
            ),
            metadata,
        }
    }
}

/// Operator alerting service. Externally owned and shared.
#[async_trait]
pub trait AlertService: Send + Sync + 'static {
    async fn raise_alert(&self, alert: &AlertRecord) -> Result<(), CollaboratorError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

/// Parameter fields of a load-centre-collect style task that identify the sample.
#[derive(Deserialize)]
struct SampleParams {
    sample_id: Scalar,
    #[serde(alias = "visit_id")]
    visit: Scalar,
    #[serde(alias = "sample_puck", alias = "container_id")]
    container: Scalar,
}

/// Reads alert tags from the delegated task's parameters.
///
/// All three identifiers must be present; otherwise the result is empty.
pub fn extract_alert_metadata(params: &serde_json::Value) -> AlertMetadata {
    match SampleParams::deserialize(params) {
        Ok(p) => BTreeMap::from([
            (MetadataKey::SampleId, p.sample_id.to_string()),
            (MetadataKey::Visit, p.visit.to_string()),
            (MetadataKey::Container, p.container.to_string()),
        ]),
        Err(e) => {
            tracing::debug!(error = %e, "task parameters carry no sample metadata");
            AlertMetadata::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_sample_metadata() {
        let params = json!({
            "sample_id": 12345,
            "visit": "cm40607-3",
            "sample_puck": 7,
            "exposure_time_s": 0.004
        });
        let md = extract_alert_metadata(&params);

        assert_eq!(md.get(&MetadataKey::SampleId).map(String::as_str), Some("12345"));
        assert_eq!(md.get(&MetadataKey::Visit).map(String::as_str), Some("cm40607-3"));
        assert_eq!(md.get(&MetadataKey::Container).map(String::as_str), Some("7"));
    }

    #[test]
    fn malformed_parameters_fall_back_to_empty() {
        assert!(extract_alert_metadata(&json!(null)).is_empty());
        assert!(extract_alert_metadata(&json!({"visit": "cm1-1"})).is_empty());
        assert!(extract_alert_metadata(&json!({
            "sample_id": [1, 2],
            "visit": "cm1-1",
            "sample_puck": 1
        }))
        .is_empty());
    }

    #[test]
    fn waiting_alert_reports_whole_minutes() {
        let rec = AlertRecord::waiting_for_beam("t-1", Duration::from_secs(179), AlertMetadata::new());
        assert!(rec.summary.contains("paused waiting for beam"));
        assert!(rec.content.contains("for 2 minutes"));
    }
}
