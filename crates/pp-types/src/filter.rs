//! The filter set adapters apply on a best-effort basis (§4.3).

use crate::document::Category;
use crate::source::SourceKind;
use std::time::Duration;

/// Query-time filters. Adapters push down whatever they can (most can
/// filter `kinds`/`categories` cheaply; few can push down `min_confidence`,
/// which is usually computed only after the result is scored) and report
/// which filters they could not apply so the pipeline enforces the rest.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub kinds: Option<Vec<SourceKind>>,
    pub categories: Option<Vec<Category>>,
    pub max_age: Option<Duration>,
    pub min_confidence: Option<f64>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<SourceKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Whether a given source kind survives this filter's `kinds` clause.
    pub fn allows_kind(&self, kind: SourceKind) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }

    /// Whether a document's age and category survive this filter, for the
    /// portion of enforcement the pipeline must do itself (adapters report
    /// which clauses they already applied).
    pub fn matches_age_and_category(
        &self,
        category: Category,
        last_updated: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.contains(&category) {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            let age = chrono::Utc::now().signed_duration_since(last_updated);
            if age.to_std().unwrap_or(Duration::ZERO) > max_age {
                return false;
            }
        }
        true
    }
}
