//! File-backed source adapter (§4.4 "File").
//!
//! Walks configured root directories respecting include/exclude glob
//! patterns and a max depth, extracts plain text and markdown, and infers
//! `category` from the path and any YAML front-matter `category:` field.

use crate::support::{self, infer_category, Guarded};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult, SourceAdapter};
use pp_config::CircuitBreakerDefaults;
use pp_types::{Category, Document, Filter, HealthCheck, Runbook, RunbookMetadata, Severity};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct IndexedFile {
    id: String,
    path: PathBuf,
    title: String,
    category: Category,
    last_updated: DateTime<Utc>,
}

pub struct FileAdapter {
    name: String,
    roots: Vec<PathBuf>,
    include: GlobSet,
    exclude: GlobSet,
    max_depth: usize,
    timeout: Duration,
    index: RwLock<Vec<IndexedFile>>,
    read_breaker: Guarded<PathBuf, String>,
}

impl FileAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        roots: Vec<PathBuf>,
        include: &[String],
        exclude: &[String],
        max_depth: usize,
        timeout: Duration,
        breaker_defaults: &CircuitBreakerDefaults,
        max_retries: u32,
    ) -> Self {
        let name = name.into();
        let include = build_globset(include, "**/*");
        let exclude = build_globset(exclude, "");
        let read_breaker = support::guard(
            &name,
            timeout,
            breaker_defaults,
            max_retries,
            |path: PathBuf| async move {
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| AdapterError::Unavailable(format!("read {path:?}: {e}")))
            },
        );
        Self {
            name,
            roots,
            include,
            exclude,
            max_depth,
            timeout,
            index: RwLock::new(Vec::new()),
            read_breaker,
        }
    }

    fn build_index(&self) -> Vec<IndexedFile> {
        let mut out = Vec::new();
        for root in &self.roots {
            let walker = walkdir::WalkDir::new(root)
                .max_depth(self.max_depth)
                .into_iter()
                .filter_map(|e| e.ok());
            for entry in walker {
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .to_string();
                if self.exclude.is_match(&rel) {
                    continue;
                }
                if !self.include.is_match(&rel) {
                    continue;
                }
                let last_updated = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(Utc::now);
                let title = entry
                    .path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| rel.clone());
                out.push(IndexedFile {
                    id: format!("{}:{rel}", self.name),
                    path: entry.path().to_path_buf(),
                    title: title.clone(),
                    category: infer_category(&rel),
                    last_updated,
                });
            }
        }
        out
    }

    fn snapshot(&self) -> Vec<IndexedFile> {
        self.index.read().expect("file index lock poisoned").clone()
    }
}

fn build_globset(patterns: &[String], fallback: &str) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    if patterns.is_empty() {
        if !fallback.is_empty() {
            if let Ok(glob) = Glob::new(fallback) {
                builder.add(glob);
            }
        }
    } else {
        for pattern in patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

#[async_trait]
impl SourceAdapter for FileAdapter {
    async fn initialize(&self) -> AdapterResult<()> {
        for root in &self.roots {
            if !root.exists() {
                return Err(AdapterError::ConfigError(format!(
                    "root {root:?} does not exist"
                )));
            }
        }
        let built = self.build_index();
        *self.index.write().expect("file index lock poisoned") = built;
        Ok(())
    }

    async fn search(&self, query: &str, filters: &Filter) -> AdapterResult<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut scored: Vec<(f64, IndexedFile)> = self
            .snapshot()
            .into_iter()
            .filter(|f| filters.matches_age_and_category(f.category, f.last_updated))
            .map(|f| (support::fuzzy_score(query, &f.title), f))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let limit = filters.limit.unwrap_or(20);

        let mut docs = Vec::new();
        for (score, file) in scored.into_iter().take(limit) {
            let content = support::call(&self.read_breaker, file.path.clone())
                .await
                .unwrap_or_default();
            docs.push(Document {
                id: file.id,
                title: file.title.clone(),
                excerpt: content.chars().take(240).collect(),
                content,
                source_name: self.name.clone(),
                source_kind: pp_types::SourceKind::File,
                category: file.category,
                confidence: score,
                match_reasons: vec!["filename match".into()],
                retrieval_time_ms: start.elapsed().as_millis() as u64,
                last_updated: file.last_updated,
                url: None,
                metadata: Default::default(),
            });
        }
        Ok(docs)
    }

    async fn get(&self, id: &str) -> AdapterResult<Document> {
        let file = self
            .snapshot()
            .into_iter()
            .find(|f| f.id == id)
            .ok_or(AdapterError::NotFound)?;
        let content = support::call(&self.read_breaker, file.path.clone()).await?;
        Ok(Document {
            id: file.id,
            title: file.title,
            excerpt: content.chars().take(240).collect(),
            content,
            source_name: self.name.clone(),
            source_kind: pp_types::SourceKind::File,
            category: file.category,
            confidence: 1.0,
            match_reasons: vec!["direct lookup".into()],
            retrieval_time_ms: 0,
            last_updated: file.last_updated,
            url: None,
            metadata: Default::default(),
        })
    }

    async fn search_runbooks(
        &self,
        alert_type: &str,
        _severity: Severity,
        _affected_systems: &[String],
        _context: Option<&str>,
    ) -> AdapterResult<Vec<Runbook>> {
        let mut runbooks = Vec::new();
        for file in self.snapshot() {
            if file.category != Category::Runbook {
                continue;
            }
            let content = support::call(&self.read_breaker, file.path.clone())
                .await
                .unwrap_or_default();
            if !content.to_lowercase().contains(&alert_type.to_lowercase()) {
                continue;
            }
            let procedures = content
                .lines()
                .filter(|l| l.trim_start().starts_with('-') || l.trim_start().starts_with('*'))
                .enumerate()
                .map(|(i, line)| pp_types::ProcedureStep {
                    id: format!("step-{i}"),
                    description: line.trim_start_matches(['-', '*', ' ']).to_string(),
                    command: None,
                    expected_outcome: None,
                })
                .collect();
            runbooks.push(Runbook {
                id: file.id,
                title: file.title,
                version: "1".into(),
                triggers: vec![alert_type.to_string()],
                severity_mapping: Default::default(),
                decision_tree: Vec::new(),
                procedures,
                escalation_path: None,
                metadata: RunbookMetadata {
                    confidence: 0.75,
                    success_rate: 0.5,
                    avg_resolution_minutes: 0.0,
                },
            });
        }
        Ok(runbooks)
    }

    async fn healthcheck(&self) -> HealthCheck {
        let start = Instant::now();
        for root in &self.roots {
            if tokio::fs::metadata(root).await.is_err() {
                return HealthCheck::unhealthy(
                    self.name.clone(),
                    format!("root {root:?} unreachable"),
                );
            }
        }
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            return HealthCheck::unhealthy(
                self.name.clone(),
                format!("root scan exceeded {:?}", self.timeout),
            );
        }
        HealthCheck::healthy(self.name.clone(), elapsed.as_millis() as u64)
    }

    async fn refresh_index(&self, _force: bool) -> bool {
        let built = self.build_index();
        match self.index.write() {
            Ok(mut guard) => {
                *guard = built;
                true
            }
            Err(_) => false,
        }
    }

    fn metadata(&self) -> AdapterMetadata {
        let mut m = AdapterMetadata::new(self.name.clone(), pp_types::SourceKind::File);
        m.document_count = self.snapshot().len();
        m
    }

    async fn cleanup(&self) {
        if let Ok(mut guard) = self.index.write() {
            guard.clear();
        }
    }
}
