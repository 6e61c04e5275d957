//! Request and response bodies of the HTTP facade.

use std::collections::BTreeMap;

use provis_schema::ValidationError;
use provis_store::{Criteria, Row};
use provis_types::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub types: Vec<String>,
    pub sources: Vec<String>,
    pub default_source: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceQuery {
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub source: Option<String>,
    #[serde(default)]
    pub rendered: bool,
}

/// A freshly issued handle for an in-flight item.
#[derive(Debug, Serialize, Deserialize)]
pub struct HandleResponse {
    pub handle: String,
    pub item_type: String,
    pub uid: Option<String>,
}

/// Field assignments applied to an in-flight item, in name order.
pub type ModifyRequest = BTreeMap<String, Value>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub name: String,
    pub message: String,
}

impl From<&(String, ValidationError)> for ErrorEntry {
    fn from((name, error): &(String, ValidationError)) -> Self {
        Self {
            name: name.clone(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved: bool,
    pub uid: Option<String>,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FindRequest {
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub projection: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindResponse {
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewNameRequest {
    pub new_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: bool,
}
