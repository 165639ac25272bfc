//! Docforge Service Protocol — v1 Frozen Wire Format
//!
//! This crate defines the canonical payload types exchanged with the two
//! external collaborators: the schema-discovery service and the document
//! generation service. The engine builds these payloads; it never performs
//! the HTTP calls itself.
//!
//! # Protocol Version
//!
//! This is **protocol v1** — the wire format is frozen. Changes require:
//! 1. Version bump in PROTOCOL_VERSION
//! 2. New golden strings in the serialization tests below
//! 3. Backward compatibility handling
//!
//! The discovery result carries its fields under the named
//! `schema.document_fields` section. Earlier revisions of the service were
//! read by sniffing "the first section" of an unordered schema object; that
//! contract is gone — the section name is part of the frozen format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current protocol version. Increment for breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Generation service
// =============================================================================

/// A single text replacement, serialized as a two-element array
/// `[old_text, new_text]` — the exact shape the generation service matches
/// against paragraph runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement(pub String, pub String);

/// A single table cell replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEditPayload {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    pub old_value: String,
    pub new_value: String,
}

/// Request body for the document-generation call. The response is an opaque
/// binary blob (the regenerated document).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub replacements: Vec<Replacement>,
    pub table_edits: Vec<TableEditPayload>,
}

// =============================================================================
// Schema-discovery service
// =============================================================================

/// One source document sent out for discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub filename: String,
    pub markdown: String,
}

/// Request body for the schema-discovery call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub documents: Vec<DocumentPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A field proposed by the discovery service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// The named field section. BTreeMap keeps ingestion order deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSection {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

/// Top-level schema object of a discovery result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySchema {
    pub document_fields: FieldSection,
}

/// A table extracted by the discovery service. Row 0 of `preview` is the
/// header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePayload {
    pub index: usize,
    #[serde(default)]
    pub preview: Vec<Vec<String>>,
}

/// Full discovery result as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub schema: DiscoverySchema,
    #[serde(default)]
    pub tables: Vec<TablePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_serializes_as_pair_array() {
        let r = Replacement("Acme Corp".into(), "Globex".into());
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"["Acme Corp","Globex"]"#
        );
    }

    #[test]
    fn test_generate_request_golden() {
        let req = GenerateRequest {
            replacements: vec![Replacement("old".into(), "new".into())],
            table_edits: vec![TableEditPayload {
                table_index: 0,
                row: 1,
                col: 2,
                old_value: "a".into(),
                new_value: "b".into(),
            }],
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"replacements":[["old","new"]],"table_edits":[{"table_index":0,"row":1,"col":2,"old_value":"a","new_value":"b"}]}"#
        );
    }

    #[test]
    fn test_discovery_result_parses_service_shape() {
        let json = r#"{
            "schema": {
                "document_fields": {
                    "fields": {
                        "org": {"label": "Org", "references": ["Acme Corp"]},
                        "venue": {"label": "Venue"}
                    }
                }
            },
            "tables": [{"index": 0, "preview": [["h1","h2"],["a","b"]]}]
        }"#;
        let result: DiscoveryResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.schema.document_fields.fields.len(), 2);
        assert_eq!(
            result.schema.document_fields.fields["org"].references,
            vec!["Acme Corp"]
        );
        // Missing references default to empty.
        assert!(result.schema.document_fields.fields["venue"]
            .references
            .is_empty());
        assert_eq!(result.tables[0].preview[1][0], "a");
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_discovery_request_omits_absent_instructions() {
        let req = DiscoveryRequest {
            documents: vec![DocumentPayload {
                filename: "a.md".into(),
                markdown: "text".into(),
            }],
            instructions: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("instructions"));
    }
}
