//! Extracted voyage document model.
//!
//! Upstream extraction produces loosely structured JSON per document. This
//! module classifies documents, pulls out the chronological event log, and
//! walks section trees for clause text and contract terms. Everything here is
//! tolerant: a malformed section is skipped, never fatal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clause::extract_number;

/// The recognized voyage document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Charter party / contract of affreightment.
    Contract,
    /// Statement of Facts: the port event log.
    Sof,
    /// Notice of Readiness.
    Nor,
    /// Letter of Protest.
    Lop,
    /// Pumping log.
    PumpingLog,
}

impl DocumentType {
    /// All recognized document types.
    pub const ALL: &'static [Self] = &[
        Self::Contract,
        Self::Sof,
        Self::Nor,
        Self::Lop,
        Self::PumpingLog,
    ];

    /// The canonical string form used in extraction payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Sof => "sof",
            Self::Nor => "nor",
            Self::Lop => "lop",
            Self::PumpingLog => "pumping_log",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contract" | "charter_party" | "charter party" => Ok(Self::Contract),
            "sof" | "statement_of_facts" | "statement of facts" => Ok(Self::Sof),
            "nor" | "notice_of_readiness" | "notice of readiness" => Ok(Self::Nor),
            "lop" | "letter_of_protest" | "letter of protest" => Ok(Self::Lop),
            "pumping_log" | "pumping log" => Ok(Self::PumpingLog),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

/// A single extracted document: its classification plus the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Document classification.
    pub document_type: DocumentType,
    /// Raw extraction payload, minus the consumed `document_type` key.
    pub content: Value,
}

impl ExtractedDocument {
    /// Builds a document from an extraction payload.
    ///
    /// The `document_type` key is consumed for classification; the rest of
    /// the object is kept verbatim. Returns `None` when the type is missing
    /// or unrecognized.
    #[must_use]
    pub fn from_value(mut value: Value) -> Option<Self> {
        let type_str = value.get("document_type")?.as_str()?.to_string();
        let document_type = type_str.parse().ok()?;
        if let Some(map) = value.as_object_mut() {
            map.remove("document_type");
        }
        Some(Self {
            document_type,
            content: value,
        })
    }

    /// The chronological event log, if this document carries one.
    ///
    /// Accepts both the extraction key `Chronological Events` and the plainer
    /// `events`.
    #[must_use]
    pub fn events(&self) -> &[Value] {
        for key in ["Chronological Events", "events"] {
            if let Some(events) = self.content.get(key).and_then(Value::as_array) {
                return events;
            }
        }
        &[]
    }

    /// All clause-like text fragments in the document, walking section trees
    /// depth-first.
    #[must_use]
    pub fn clause_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        collect_texts(&self.content, &mut texts);
        texts
    }

    /// The whole document flattened to one text blob, clause per line.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.clause_texts().join("\n")
    }

    /// Contract-side settlement terms, harvested from section headings.
    ///
    /// Only meaningful for [`DocumentType::Contract`]; other documents yield
    /// empty terms.
    #[must_use]
    pub fn voyage_terms(&self) -> crate::calculate::VoyageTerms {
        let mut terms = crate::calculate::VoyageTerms::default();
        if self.document_type != DocumentType::Contract {
            return terms;
        }

        collect_terms(&self.content, None, &mut terms);
        terms
    }
}

/// Recursively gathers heading/body text from a section tree.
///
/// Objects contribute "heading: body" lines when both are present; arrays and
/// nested objects are walked; bare strings are taken as-is.
fn collect_texts(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_texts(item, out);
            }
        }
        Value::Object(map) => {
            let heading = ["heading", "title", "clause"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let body = ["body", "content", "text"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty());

            match (heading, body) {
                (Some(h), Some(b)) => out.push(format!("{h}: {b}")),
                (Some(h), None) => out.push(h.to_string()),
                (None, Some(b)) => out.push(b.to_string()),
                (None, None) => {}
            }

            for (key, nested) in map {
                if matches!(key.as_str(), "heading" | "title" | "clause" | "body" | "content" | "text") {
                    continue;
                }
                collect_texts(nested, out);
            }
        }
        _ => {}
    }
}

fn collect_terms(
    value: &Value,
    heading: Option<&str>,
    terms: &mut crate::calculate::VoyageTerms,
) {
    match value {
        Value::String(s) => {
            if let Some(heading) = heading {
                assign_term(heading, s, terms);
            }
        }
        Value::Number(n) => {
            if let (Some(heading), Some(v)) = (heading, n.as_f64()) {
                assign_term_value(heading, v, terms);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_terms(item, heading, terms);
            }
        }
        Value::Object(map) => {
            let own_heading = ["heading", "title", "clause"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str));
            if let Some(own) = own_heading {
                for key in ["body", "content", "text"] {
                    if let Some(body) = map.get(key) {
                        collect_terms(body, Some(own), terms);
                    }
                }
            }
            for (key, nested) in map {
                collect_terms(nested, Some(key), terms);
            }
        }
        _ => {}
    }
}

fn assign_term(heading: &str, body: &str, terms: &mut crate::calculate::VoyageTerms) {
    if let Some(value) = extract_number(body) {
        assign_term_value(heading, value, terms);
    }
}

fn assign_term_value(heading: &str, value: f64, terms: &mut crate::calculate::VoyageTerms) {
    let heading = heading.to_lowercase();
    if heading.contains("quantity") || heading.contains("cargo") {
        terms.cargo_quantity.get_or_insert(value);
    } else if heading.contains("discharge rate") || heading.contains("disrate") {
        terms.discharge_rate.get_or_insert(value);
    } else if heading.contains("demurrage") {
        terms.demurrage_rate.get_or_insert(value);
    } else if heading.contains("despatch") || heading.contains("dispatch") {
        terms.despatch_rate.get_or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_known_document_types() {
        for (raw, expected) in [
            ("sof", DocumentType::Sof),
            ("Statement of Facts", DocumentType::Sof),
            ("contract", DocumentType::Contract),
            ("charter_party", DocumentType::Contract),
            ("pumping log", DocumentType::PumpingLog),
        ] {
            assert_eq!(raw.parse::<DocumentType>().unwrap(), expected, "{raw}");
        }
        assert!("invoice".parse::<DocumentType>().is_err());
    }

    #[test]
    fn document_type_round_trips_through_serde() {
        let json = serde_json::to_string(&DocumentType::PumpingLog).unwrap();
        assert_eq!(json, "\"pumping_log\"");
        let parsed: DocumentType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DocumentType::PumpingLog);
    }

    #[test]
    fn from_value_consumes_the_type_key() {
        let doc = ExtractedDocument::from_value(json!({
            "document_type": "sof",
            "Chronological Events": [{"timestamp": "2025-07-01 08:00", "event": "Arrived"}],
        }))
        .unwrap();

        assert_eq!(doc.document_type, DocumentType::Sof);
        assert!(doc.content.get("document_type").is_none());
        assert_eq!(doc.events().len(), 1);
    }

    #[test]
    fn from_value_rejects_missing_or_unknown_type() {
        assert!(ExtractedDocument::from_value(json!({"events": []})).is_none());
        assert!(ExtractedDocument::from_value(json!({"document_type": "invoice"})).is_none());
    }

    #[test]
    fn clause_texts_walk_nested_sections() {
        let doc = ExtractedDocument::from_value(json!({
            "document_type": "contract",
            "Sections": [
                {
                    "heading": "Laytime",
                    "body": "Laytime to commence twelve (12) hours after NOR",
                },
                {
                    "title": "Exceptions",
                    "content": [
                        "Time lost due to rain not to count",
                        {"text": "Sundays and holidays excepted"},
                    ],
                },
            ],
        }))
        .unwrap();

        let texts = doc.clause_texts();
        assert!(texts
            .iter()
            .any(|t| t == "Laytime: Laytime to commence twelve (12) hours after NOR"));
        assert!(texts.iter().any(|t| t == "Time lost due to rain not to count"));
        assert!(texts.iter().any(|t| t == "Sundays and holidays excepted"));
        assert!(doc.full_text().contains("rain"));
    }

    #[test]
    fn voyage_terms_harvested_from_contract_sections() {
        let doc = ExtractedDocument::from_value(json!({
            "document_type": "contract",
            "Sections": [
                {"heading": "Cargo Quantity", "body": "50,000 MT soybean meal"},
                {"heading": "Discharge Rate", "body": "5,000 MT per weather working day"},
                {"heading": "Demurrage", "body": "USD 12,000 per day pro rata"},
                {"heading": "Despatch", "body": "USD 6,000 per day on working time saved"},
            ],
        }))
        .unwrap();

        let terms = doc.voyage_terms();
        assert_eq!(terms.cargo_quantity, Some(50_000.0));
        assert_eq!(terms.discharge_rate, Some(5_000.0));
        assert_eq!(terms.demurrage_rate, Some(12_000.0));
        assert_eq!(terms.despatch_rate, Some(6_000.0));
    }

    #[test]
    fn non_contract_documents_yield_empty_terms() {
        let doc = ExtractedDocument::from_value(json!({
            "document_type": "sof",
            "Demurrage": "USD 12,000",
        }))
        .unwrap();
        assert_eq!(doc.voyage_terms(), crate::calculate::VoyageTerms::default());
    }

    #[test]
    fn events_accepts_plain_key() {
        let doc = ExtractedDocument::from_value(json!({
            "document_type": "sof",
            "events": [{}, {}],
        }))
        .unwrap();
        assert_eq!(doc.events().len(), 2);
    }
}
