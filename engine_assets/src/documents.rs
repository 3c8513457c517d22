//! Host documents.
//!
//! The host pushes data as envelopes:
//!
//! ```json
//! {"type": "Material", "name": "brick", "data": { ... }}
//! ```
//!
//! or as an array of envelopes. Entries are independent: a malformed or
//! rejected entry is reported and the remaining entries still apply.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{"type", "name", "data"}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDocument {
    #[serde(rename = "type")]
    pub class: String,
    pub name: String,
    pub data: Value,
}

/// Splits a payload into envelopes; each entry parses independently.
///
/// Fails only if `text` is not JSON at all.
pub fn parse_documents(text: &str) -> anyhow::Result<Vec<serde_json::Result<HostDocument>>> {
    let value: Value = serde_json::from_str(text).context("host payload is not valid JSON")?;
    Ok(match value {
        Value::Array(entries) => entries.into_iter().map(serde_json::from_value).collect(),
        single => vec![serde_json::from_value(single)],
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDocument {
    pub class: String,
    pub name: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDocument {
    /// Position of the entry in the payload.
    pub index: usize,
    /// `type/name` if the envelope itself was readable.
    pub label: Option<String>,
    pub error: String,
}

/// Outcome of one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub applied: Vec<AppliedDocument>,
    pub rejected: Vec<RejectedDocument>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.applied.extend(other.applied);
        self.rejected.extend(other.rejected);
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} rejected",
            self.applied.len(),
            self.rejected.len()
        )
    }
}
