//! `search_knowledge_base` (§6).

use crate::{ToolResult, Tools};
use pp_types::{Category, Document, Filter};

#[derive(Debug, Clone)]
pub struct KnowledgeBaseResult {
    pub results: Vec<Document>,
    pub total: usize,
    pub query_time_ms: u64,
}

impl Tools {
    /// Free-text search across every configured source, routed through the
    /// retrieval pipeline for normalization, intent classification, and
    /// ranking. `sources` filters by adapter name after ranking — unlike
    /// `kinds`/`categories`, source-name filtering isn't part of
    /// [`pp_types::Filter`] (the pipeline plans by kind and priority, not
    /// by individual source identity), so this tool applies it as a
    /// post-filter over the ranked list.
    pub async fn search_knowledge_base(
        &self,
        query: &str,
        sources: Option<&[String]>,
        categories: Option<Vec<Category>>,
        limit: Option<usize>,
        include_content: Option<bool>,
    ) -> ToolResult<KnowledgeBaseResult> {
        // An empty/all-control query is a boundary success (empty result, no
        // adapter invocation), not a validation error — `Pipeline::search`
        // already implements that short-circuit.
        let mut filters = Filter::new().with_limit(limit.unwrap_or(10));
        if let Some(categories) = categories {
            filters = filters.with_categories(categories);
        }

        let result = self.pipeline.search(query, filters, None, None, false).await?;
        let mut documents = result.documents;

        if let Some(sources) = sources {
            documents.retain(|doc| sources.iter().any(|s| s == &doc.source_name));
        }
        if !include_content.unwrap_or(false) {
            for doc in &mut documents {
                doc.content.clear();
            }
        }

        let total = documents.len();
        Ok(KnowledgeBaseResult {
            results: documents,
            total,
            query_time_ms: result.query_time_ms,
        })
    }
}
