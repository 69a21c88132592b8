use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{combination::INPUTS_KEY, models::Workflow};

/// Input DTO for `POST /workflow`.
///
/// ## Example
/// ```json
/// {
///   "name": "txt2img",
///   "document": {
///     "3": {"class_type": "KSampler", "inputs": {"seed": 5, "cfg": 8.0}},
///     "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "a cat"}}
///   }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewWorkflowDto {
    /// Human-readable name. Must be non-empty, max 255 characters.
    pub name: String,
    /// Optional free text description.
    pub description: Option<String>,
    /// The workflow document: a JSON object mapping node ids to node objects.
    pub document: serde_json::Value,
}

/// Partial update for `PATCH /workflow/{id}`. Absent fields are left unchanged.
#[derive(Debug, Serialize, Deserialize, Default, ToSchema)]
pub struct UpdateWorkflowDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub document: Option<serde_json::Value>,
}

/// Workflow without its document, returned by list endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkflowSummaryDto {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// Full workflow returned by `GET /workflow/{id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkflowDto {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub document: serde_json::Value,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// A node of a workflow document, as returned by `GET /workflow/{id}/nodes`.
/// Lists the parameters a sweep axis can target.
#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct NodeDto {
    pub node_id: String,
    /// The node's `class_type` when present.
    pub class_type: Option<String>,
    /// Keys of the node's `inputs` object, sorted.
    pub input_keys: Vec<String>,
}

impl From<Workflow> for WorkflowSummaryDto {
    fn from(w: Workflow) -> Self {
        Self {
            id: w.id,
            owner_id: w.owner_id,
            name: w.name,
            description: w.description,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

impl From<Workflow> for WorkflowDto {
    fn from(w: Workflow) -> Self {
        Self {
            id: w.id,
            owner_id: w.owner_id,
            name: w.name,
            description: w.description,
            document: w.document,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

impl NodeDto {
    /// Describe the object-valued entries of a document, ordered by node id.
    pub fn list(document: &serde_json::Value) -> Vec<NodeDto> {
        let Some(nodes) = document.as_object() else {
            return vec![];
        };
        let mut out: Vec<NodeDto> = nodes
            .iter()
            .filter_map(|(node_id, node)| {
                let node = node.as_object()?;
                let mut input_keys: Vec<String> = node
                    .get(INPUTS_KEY)
                    .and_then(|i| i.as_object())
                    .map(|i| i.keys().cloned().collect())
                    .unwrap_or_default();
                input_keys.sort();
                Some(NodeDto {
                    node_id: node_id.clone(),
                    class_type: node
                        .get("class_type")
                        .and_then(|c| c.as_str())
                        .map(str::to_string),
                    input_keys,
                })
            })
            .collect();
        out.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        out
    }
}
