//! Git-host source adapter (§4.4 "Git-host").
//!
//! Reads each configured repository's README, docs tree, and optionally its
//! issues/pull requests from a generic REST git-host API. Stays under a
//! conservative share of the remote's published rate quota (enforced by
//! [`support::acquire_rate_permit`]) plus a minimum inter-request interval,
//! and degrades itself — tripping the breaker — the moment the remote's
//! rate-limit header reports exhaustion.

use crate::support::{self, infer_category, Guarded};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult, BackendError, SourceAdapter};
use pp_config::CircuitBreakerDefaults;
use pp_ratelimiter::RateLimiterConfigBuilder;
use pp_types::{Category, Document, Filter, HealthCheck, Runbook, RunbookMetadata, Severity};
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone)]
struct IndexedItem {
    id: String,
    repo: String,
    path: String,
    title: String,
    category: Category,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Deserialize)]
struct IssueLike {
    number: u64,
    title: String,
    body: Option<String>,
    updated_at: DateTime<Utc>,
}

pub struct GitHostAdapter {
    name: String,
    base_url: String,
    repositories: Vec<String>,
    include_issues: bool,
    include_pull_requests: bool,
    min_request_interval: Duration,
    last_request: AsyncMutex<Instant>,
    rate_limiter: pp_ratelimiter::RateLimiterLayer,
    client: Client,
    timeout: Duration,
    degraded: AtomicBool,
    fetch_breaker: Guarded<String, String>,
    index: RwLock<Vec<IndexedItem>>,
}

impl GitHostAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        repositories: Vec<String>,
        include_issues: bool,
        include_pull_requests: bool,
        rate_budget_fraction: f64,
        min_request_interval_ms: u64,
        timeout: Duration,
        breaker_defaults: &CircuitBreakerDefaults,
        max_retries: u32,
    ) -> Self {
        let name = name.into();
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let rate_limiter = RateLimiterConfigBuilder::of_remote_quota(
            5000,
            rate_budget_fraction,
            Duration::from_secs(3600),
        )
        .timeout_duration(Duration::from_millis(50))
        .name(format!("{name}-quota"))
        .build();

        let fetch_client = client.clone();
        let fetch_breaker = support::guard(
            &name,
            timeout,
            breaker_defaults,
            max_retries,
            move |url: String| {
                let client = fetch_client.clone();
                async move { fetch_url(&client, &url).await }
            },
        );

        Self {
            name,
            base_url,
            repositories,
            include_issues,
            include_pull_requests,
            min_request_interval: Duration::from_millis(min_request_interval_ms),
            last_request: AsyncMutex::new(Instant::now() - Duration::from_secs(3600)),
            rate_limiter,
            client,
            timeout,
            degraded: AtomicBool::new(false),
            fetch_breaker,
            index: RwLock::new(Vec::new()),
        }
    }

    fn snapshot(&self) -> Vec<IndexedItem> {
        self.index.read().expect("git-host index lock poisoned").clone()
    }

    /// Enforces both the remote-quota budget and the minimum inter-request
    /// spacing before a single HTTP call.
    async fn throttle(&self) -> AdapterResult<()> {
        support::acquire_rate_permit(&self.rate_limiter).await?;
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_request_interval {
            tokio::time::sleep(self.min_request_interval - elapsed).await;
        }
        *last = Instant::now();
        Ok(())
    }

    async fn fetch_text(&self, path: &str) -> AdapterResult<String> {
        self.throttle().await?;
        let url = format!("{}{}", self.base_url, path);
        support::call(&self.fetch_breaker, url).await
    }

    async fn index_repo(&self, repo: &str) -> Vec<IndexedItem> {
        let mut items = Vec::new();

        if let Ok(_readme) = self.fetch_text(&format!("/repos/{repo}/readme")).await {
            items.push(IndexedItem {
                id: format!("{}:{repo}:README", self.name),
                repo: repo.to_string(),
                path: "README".into(),
                title: format!("{repo} README"),
                category: infer_category("readme guide"),
                last_updated: Utc::now(),
            });
        }

        if let Ok(body) = self.fetch_text(&format!("/repos/{repo}/tree?path=docs")).await {
            if let Ok(entries) = serde_json::from_str::<Vec<TreeEntry>>(&body) {
                for entry in entries.into_iter().filter(|e| e.entry_type == "file") {
                    items.push(IndexedItem {
                        id: format!("{}:{repo}:{}", self.name, entry.path),
                        repo: repo.to_string(),
                        path: entry.path.clone(),
                        title: entry.path.clone(),
                        category: infer_category(&entry.path),
                        last_updated: Utc::now(),
                    });
                }
            }
        }

        for (kind, enabled) in [
            ("issues", self.include_issues),
            ("pulls", self.include_pull_requests),
        ] {
            if !enabled {
                continue;
            }
            if let Ok(body) = self.fetch_text(&format!("/repos/{repo}/{kind}")).await {
                if let Ok(entries) = serde_json::from_str::<Vec<IssueLike>>(&body) {
                    for issue in entries {
                        items.push(IndexedItem {
                            id: format!("{}:{repo}:{kind}:{}", self.name, issue.number),
                            repo: repo.to_string(),
                            path: format!("{kind}/{}", issue.number),
                            title: issue.title,
                            category: Category::General,
                            last_updated: issue.updated_at,
                        });
                    }
                }
            }
        }

        items
    }
}

async fn fetch_url(client: &Client, url: &str) -> AdapterResult<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("git-host request failed: {e}")))?;

    if let Some(remaining) = resp.headers().get("x-ratelimit-remaining") {
        if remaining.to_str().ok() == Some("0") {
            return Err(AdapterError::RateLimited { retry_after: None });
        }
    }

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(AdapterError::NotFound);
    }
    if resp.status() == reqwest::StatusCode::UNAUTHORIZED
        || resp.status() == reqwest::StatusCode::FORBIDDEN
    {
        return Err(AdapterError::AuthError(format!(
            "git-host returned {}",
            resp.status()
        )));
    }
    if !resp.status().is_success() {
        return Err(AdapterError::Application(BackendError::new(format!(
            "git-host returned {}",
            resp.status()
        ))));
    }

    resp.text()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("reading git-host response: {e}")))
}

#[async_trait]
impl SourceAdapter for GitHostAdapter {
    async fn initialize(&self) -> AdapterResult<()> {
        if self.repositories.is_empty() {
            return Err(AdapterError::ConfigError(
                "git_host source has no configured repositories".into(),
            ));
        }
        let mut built = Vec::new();
        for repo in self.repositories.clone() {
            built.extend(self.index_repo(&repo).await);
        }
        *self.index.write().expect("git-host index lock poisoned") = built;
        Ok(())
    }

    async fn search(&self, query: &str, filters: &Filter) -> AdapterResult<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut scored: Vec<(f64, IndexedItem)> = self
            .snapshot()
            .into_iter()
            .filter(|it| filters.matches_age_and_category(it.category, it.last_updated))
            .map(|it| (support::fuzzy_score(query, &it.title), it))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let limit = filters.limit.unwrap_or(20);

        let mut docs = Vec::new();
        for (score, item) in scored.into_iter().take(limit) {
            let content = self
                .fetch_text(&format!("/repos/{}/contents/{}", item.repo, item.path))
                .await
                .unwrap_or_default();
            docs.push(Document {
                id: item.id,
                title: item.title.clone(),
                excerpt: content.chars().take(240).collect(),
                content,
                source_name: self.name.clone(),
                source_kind: pp_types::SourceKind::GitHost,
                category: item.category,
                confidence: score,
                match_reasons: vec!["title match".into()],
                retrieval_time_ms: start.elapsed().as_millis() as u64,
                last_updated: item.last_updated,
                url: Some(format!("{}/repos/{}/{}", self.base_url, item.repo, item.path)),
                metadata: Default::default(),
            });
        }
        Ok(docs)
    }

    async fn get(&self, id: &str) -> AdapterResult<Document> {
        let item = self
            .snapshot()
            .into_iter()
            .find(|it| it.id == id)
            .ok_or(AdapterError::NotFound)?;
        let content = self
            .fetch_text(&format!("/repos/{}/contents/{}", item.repo, item.path))
            .await?;
        Ok(Document {
            id: item.id,
            title: item.title,
            excerpt: content.chars().take(240).collect(),
            content,
            source_name: self.name.clone(),
            source_kind: pp_types::SourceKind::GitHost,
            category: item.category,
            confidence: 1.0,
            match_reasons: vec!["direct lookup".into()],
            retrieval_time_ms: 0,
            last_updated: item.last_updated,
            url: Some(format!("{}/repos/{}/{}", self.base_url, item.repo, item.path)),
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
        for item in self.snapshot() {
            if item.category != Category::Runbook {
                continue;
            }
            let content = self
                .fetch_text(&format!("/repos/{}/contents/{}", item.repo, item.path))
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
                id: item.id,
                title: item.title,
                version: "1".into(),
                triggers: vec![alert_type.to_string()],
                severity_mapping: Default::default(),
                decision_tree: Vec::new(),
                procedures,
                escalation_path: None,
                metadata: RunbookMetadata {
                    confidence: 0.7,
                    success_rate: 0.5,
                    avg_resolution_minutes: 0.0,
                },
            });
        }
        Ok(runbooks)
    }

    async fn healthcheck(&self) -> HealthCheck {
        let start = Instant::now();
        let Some(repo) = self.repositories.first() else {
            return HealthCheck::unhealthy(self.name.clone(), "no repositories configured");
        };
        match self
            .client
            .get(format!("{}/repos/{repo}", self.base_url))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                if self.degraded.load(Ordering::Relaxed) {
                    return HealthCheck::unhealthy(
                        self.name.clone(),
                        "rate budget exhausted, degraded",
                    );
                }
                HealthCheck::healthy(self.name.clone(), start.elapsed().as_millis() as u64)
            }
            Ok(resp) => HealthCheck::unhealthy(
                self.name.clone(),
                format!("git-host returned {}", resp.status()),
            ),
            Err(e) => HealthCheck::unhealthy(self.name.clone(), e.to_string()),
        }
    }

    async fn refresh_index(&self, _force: bool) -> bool {
        let mut built = Vec::new();
        for repo in self.repositories.clone() {
            built.extend(self.index_repo(&repo).await);
        }
        match self.index.write() {
            Ok(mut guard) => {
                *guard = built;
                true
            }
            Err(_) => false,
        }
    }

    fn metadata(&self) -> AdapterMetadata {
        let mut m = AdapterMetadata::new(self.name.clone(), pp_types::SourceKind::GitHost);
        m.document_count = self.snapshot().len();
        if self.degraded.load(Ordering::Relaxed) {
            m.success_rate = 0.5;
        }
        m
    }

    async fn cleanup(&self) {
        if let Ok(mut guard) = self.index.write() {
            guard.clear();
        }
        let _ = &self.timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_rejects_empty_repository_list() {
        let mut adapter = GitHostAdapter::new(
            "gh",
            "https://git.example.com/api",
            vec![],
            false,
            false,
            0.5,
            100,
            Duration::from_secs(5),
            &CircuitBreakerDefaults::default(),
            1,
        );
        assert!(matches!(
            adapter.initialize().await,
            Err(AdapterError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn healthcheck_without_repos_reports_unhealthy() {
        let adapter = GitHostAdapter::new(
            "gh",
            "https://git.example.com/api",
            vec![],
            false,
            false,
            0.5,
            100,
            Duration::from_secs(5),
            &CircuitBreakerDefaults::default(),
            1,
        );
        let hc = adapter.healthcheck().await;
        assert!(!hc.healthy);
    }

    #[test]
    fn metadata_reports_kind() {
        let adapter = GitHostAdapter::new(
            "gh",
            "https://git.example.com/api",
            vec!["org/repo".into()],
            true,
            false,
            0.5,
            100,
            Duration::from_secs(5),
            &CircuitBreakerDefaults::default(),
            1,
        );
        assert_eq!(adapter.metadata().kind, pp_types::SourceKind::GitHost);
    }
}
