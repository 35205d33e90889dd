//! Adapter self-description, returned by `metadata()` (§4.3). Never
//! throws — if an adapter can't answer one of these fields it reports a
//! zero/default rather than an error.

use pp_types::SourceKind;

#[derive(Debug, Clone)]
pub struct AdapterMetadata {
    pub name: String,
    pub kind: SourceKind,
    pub document_count: usize,
    pub avg_response_time_ms: f64,
    pub success_rate: f64,
}

impl AdapterMetadata {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            document_count: 0,
            avg_response_time_ms: 0.0,
            success_rate: 1.0,
        }
    }
}
