//! # Event documents exchanged between the execution engine and observers.
//!
//! A run produces, in order:
//! ```text
//! RunStart{run_uid} ──► Descriptor{descriptor_uid, run_uid}* ──► DataEvent{descriptor_uid}* ──► RunStop{run_start = run_uid}
//! ```
//! Runs may nest; each run keeps its own internal ordering.
//!
//! On the wire a document is a `{"name": ..., "doc": {...}}` pair. Decoding goes
//! through [`Document::from_json`] / [`Document::from_value`], which reject
//! unknown kinds, missing fields and empty identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Opening document of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStart {
    pub run_uid: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Names of gated listeners that should activate for this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate_callbacks: Option<Vec<String>>,
    /// Logical run name, matched against a gate's run key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
}

impl RunStart {
    pub fn new(run_uid: impl Into<String>) -> Self {
        Self {
            run_uid: run_uid.into(),
            metadata: BTreeMap::new(),
            activate_callbacks: None,
            run_name: None,
        }
    }

    /// Start document with a freshly generated (UUIDv4) run uid.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_activate_callbacks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activate_callbacks = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True if `name` is listed in `activate_callbacks`.
    pub fn activates(&self, name: &str) -> bool {
        self.activate_callbacks
            .as_deref()
            .is_some_and(|names| names.iter().any(|n| n == name))
    }
}

/// Describes one stream of data events inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub descriptor_uid: String,
    pub run_uid: String,
    pub name: String,
}

/// One reading, attached to a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEvent {
    pub descriptor_uid: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    Failure,
    Abort,
}

/// Closing document of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStop {
    /// Uid of the [`RunStart`] this stop closes.
    pub run_start: String,
    pub exit_status: ExitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Closed set of document kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "doc", rename_all = "snake_case")]
pub enum Document {
    #[serde(rename = "start")]
    RunStart(RunStart),
    Descriptor(Descriptor),
    #[serde(rename = "event")]
    DataEvent(DataEvent),
    #[serde(rename = "stop")]
    RunStop(RunStop),
}

impl Document {
    /// Short kind name, matching the wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Document::RunStart(_) => "start",
            Document::Descriptor(_) => "descriptor",
            Document::DataEvent(_) => "event",
            Document::RunStop(_) => "stop",
        }
    }

    /// Decodes and validates a JSON document.
    ///
    /// ```
    /// use runvisor::Document;
    ///
    /// let doc = Document::from_json(r#"{"name":"stop","doc":{"run_start":"abc","exit_status":"success"}}"#).unwrap();
    /// assert_eq!(doc.kind(), "stop");
    ///
    /// assert!(Document::from_json(r#"{"name":"stop","doc":{"exit_status":"success"}}"#).is_err());
    /// ```
    pub fn from_json(raw: &str) -> Result<Self, DocumentError> {
        let doc: Document = serde_json::from_str(raw)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Decodes and validates an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DocumentError> {
        let doc: Document = serde_json::from_value(value)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Checks that every identifier the document carries is non-empty.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let kind = self.kind();
        let require = |field: &'static str, value: &str| {
            if value.is_empty() {
                Err(DocumentError::EmptyField { kind, field })
            } else {
                Ok(())
            }
        };
        match self {
            Document::RunStart(d) => require("run_uid", &d.run_uid),
            Document::Descriptor(d) => {
                require("descriptor_uid", &d.descriptor_uid)?;
                require("run_uid", &d.run_uid)
            }
            Document::DataEvent(d) => require("descriptor_uid", &d.descriptor_uid),
            Document::RunStop(d) => require("run_start", &d.run_start),
        }
    }
}

impl From<RunStart> for Document {
    fn from(d: RunStart) -> Self {
        Document::RunStart(d)
    }
}

impl From<Descriptor> for Document {
    fn from(d: Descriptor) -> Self {
        Document::Descriptor(d)
    }
}

impl From<DataEvent> for Document {
    fn from(d: DataEvent) -> Self {
        Document::DataEvent(d)
    }
}

impl From<RunStop> for Document {
    fn from(d: RunStop) -> Self {
        Document::RunStop(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_decodes_with_optional_fields_absent() {
        let doc = Document::from_value(json!({
            "name": "start",
            "doc": {"run_uid": "r1"}
        }))
        .unwrap();

        match doc {
            Document::RunStart(start) => {
                assert_eq!(start.run_uid, "r1");
                assert!(start.metadata.is_empty());
                assert!(start.activate_callbacks.is_none());
                assert!(!start.activates("Writer"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Document::from_value(json!({"name": "resource", "doc": {}})).unwrap_err();
        assert_eq!(err.as_label(), "document_malformed");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let err = Document::from_value(json!({
            "name": "descriptor",
            "doc": {"descriptor_uid": "d1", "run_uid": "", "name": "primary"}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::EmptyField {
                kind: "descriptor",
                field: "run_uid"
            }
        ));
    }

    #[test]
    fn bad_exit_status_is_rejected() {
        let err = Document::from_json(
            r#"{"name":"stop","doc":{"run_start":"r1","exit_status":"exploded"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.as_label(), "document_malformed");
    }

    #[test]
    fn activation_list_lookup_is_exact() {
        let start = RunStart::new("r1").with_activate_callbacks(["ZocaloCallback", "Ispyb"]);
        assert!(start.activates("Ispyb"));
        assert!(!start.activates("ispyb"));
        assert!(!start.activates("Nexus"));
    }
}
