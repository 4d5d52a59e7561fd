//! Event schema definitions sent to the controller's schema API.
//!
//! Each field carries the backend's type name for the matching record field.

use serde::Serialize;

/// Envelope expected by the schema-create endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDefWrapper {
    pub schema: JobSchemaDef,
}

/// Field-to-type mapping for the job record schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSchemaDef {
    pub name: &'static str,
    pub cluster_name: &'static str,
    pub namespace: &'static str,
    pub labels: &'static str,
    pub annotations: &'static str,
    pub active: &'static str,
    pub success: &'static str,
    pub failed: &'static str,
    pub start_time: &'static str,
    pub end_time: &'static str,
    pub duration: &'static str,
    pub active_deadline_seconds: &'static str,
    pub completions: &'static str,
    pub backoff_limit: &'static str,
    pub parallelism: &'static str,
}

/// Schema definition matching [`clusterlens_core::JobRecord`].
pub fn job_schema() -> SchemaDefWrapper {
    SchemaDefWrapper {
        schema: JobSchemaDef {
            name: "string",
            cluster_name: "string",
            namespace: "string",
            labels: "string",
            annotations: "string",
            active: "integer",
            success: "integer",
            failed: "integer",
            start_time: "date",
            end_time: "date",
            duration: "float",
            active_deadline_seconds: "integer",
            completions: "integer",
            backoff_limit: "integer",
            parallelism: "integer",
        },
    }
}
