//! Wiki source adapter (§4.4 "Wiki").
//!
//! Authenticates per [`WikiAuth`], paginates through configured spaces, and
//! prefers the wiki's own search endpoint over an in-memory scan when the
//! backend exposes one. A `429` with `Retry-After` is honored with a single
//! bounded wait before the call is reported rate-limited.

use crate::support::{self, infer_category, Guarded};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult, BackendError, SourceAdapter};
use pp_config::CircuitBreakerDefaults;
use pp_types::{Category, Document, Filter, HealthCheck, Runbook, RunbookMetadata, Severity, WikiAuth};
use reqwest::Client;
use serde::Deserialize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct IndexedPage {
    id: String,
    space: String,
    title: String,
    category: Category,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PageSummary {
    id: String,
    title: String,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PageList {
    results: Vec<PageSummary>,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct PageBody {
    content: String,
}

enum AuthHeader {
    Bearer(String),
    Basic { username: String, password: String },
    ApiKey { header: String, value: String },
}

pub struct WikiAdapter {
    name: String,
    base_url: String,
    spaces: Vec<String>,
    auth: AuthHeader,
    client: Client,
    timeout: Duration,
    supports_native_search: std::sync::atomic::AtomicBool,
    fetch_breaker: Guarded<(String, bool), String>,
    index: RwLock<Vec<IndexedPage>>,
}

impl WikiAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        auth: &WikiAuth,
        spaces: Vec<String>,
        timeout: Duration,
        breaker_defaults: &CircuitBreakerDefaults,
        max_retries: u32,
    ) -> AdapterResult<Self> {
        let name = name.into();
        let auth = resolve_auth(auth)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let base_url = base_url.into();

        let fetch_client = client.clone();
        let fetch_auth = clone_auth(&auth);
        let fetch_base = base_url.clone();
        let fetch_breaker = support::guard(
            &name,
            timeout,
            breaker_defaults,
            max_retries,
            move |(path, is_search): (String, bool)| {
                let client = fetch_client.clone();
                let auth = clone_auth(&fetch_auth);
                let url = format!("{fetch_base}{path}");
                async move { fetch_with_auth(&client, &auth, &url, is_search).await }
            },
        );

        Ok(Self {
            name,
            base_url,
            spaces,
            auth,
            client,
            timeout,
            supports_native_search: std::sync::atomic::AtomicBool::new(true),
            fetch_breaker,
            index: RwLock::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> Vec<IndexedPage> {
        self.index.read().expect("wiki index lock poisoned").clone()
    }

    async fn fetch(&self, path: String, is_search: bool) -> AdapterResult<String> {
        support::call(&self.fetch_breaker, (path, is_search)).await
    }

    async fn index_space(&self, space: &str) -> Vec<IndexedPage> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let path = match &cursor {
                Some(c) => format!("/spaces/{space}/pages?cursor={c}"),
                None => format!("/spaces/{space}/pages"),
            };
            let Ok(body) = self.fetch(path, false).await else {
                break;
            };
            let Ok(page) = serde_json::from_str::<PageList>(&body) else {
                break;
            };
            for p in page.results {
                out.push(IndexedPage {
                    id: p.id.clone(),
                    space: space.to_string(),
                    title: p.title.clone(),
                    category: infer_category(&p.title),
                    last_updated: p.updated_at,
                });
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        out
    }
}

fn resolve_auth(auth: &WikiAuth) -> AdapterResult<AuthHeader> {
    let env = |var: &str| {
        std::env::var(var)
            .map_err(|_| AdapterError::AuthError(format!("credential env var {var} is not set")))
    };
    match auth {
        WikiAuth::Bearer { token_env } => Ok(AuthHeader::Bearer(env(token_env)?)),
        WikiAuth::OAuth { token_env } => Ok(AuthHeader::Bearer(env(token_env)?)),
        WikiAuth::Basic {
            username,
            password_env,
        } => Ok(AuthHeader::Basic {
            username: username.clone(),
            password: env(password_env)?,
        }),
        WikiAuth::ApiKey { header, key_env } => Ok(AuthHeader::ApiKey {
            header: header.clone(),
            value: env(key_env)?,
        }),
    }
}

fn clone_auth(auth: &AuthHeader) -> AuthHeader {
    match auth {
        AuthHeader::Bearer(t) => AuthHeader::Bearer(t.clone()),
        AuthHeader::Basic { username, password } => AuthHeader::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        AuthHeader::ApiKey { header, value } => AuthHeader::ApiKey {
            header: header.clone(),
            value: value.clone(),
        },
    }
}

async fn fetch_with_auth(
    client: &Client,
    auth: &AuthHeader,
    url: &str,
    is_search: bool,
) -> AdapterResult<String> {
    let mut req = client.get(url);
    req = match auth {
        AuthHeader::Bearer(token) => req.bearer_auth(token),
        AuthHeader::Basic { username, password } => req.basic_auth(username, Some(password)),
        AuthHeader::ApiKey { header, value } => req.header(header, value),
    };

    let resp = req
        .send()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("wiki request failed: {e}")))?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(AdapterError::RateLimited { retry_after });
    }
    if is_search && resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(AdapterError::NotFound);
    }
    if resp.status() == reqwest::StatusCode::UNAUTHORIZED
        || resp.status() == reqwest::StatusCode::FORBIDDEN
    {
        return Err(AdapterError::AuthError(format!(
            "wiki returned {}",
            resp.status()
        )));
    }
    if !resp.status().is_success() {
        return Err(AdapterError::Application(BackendError::new(format!(
            "wiki returned {}",
            resp.status()
        ))));
    }

    resp.text()
        .await
        .map_err(|e| AdapterError::Unavailable(format!("reading wiki response: {e}")))
}

#[async_trait]
impl SourceAdapter for WikiAdapter {
    async fn initialize(&self) -> AdapterResult<()> {
        if self.spaces.is_empty() {
            return Err(AdapterError::ConfigError(
                "wiki source has no configured spaces".into(),
            ));
        }
        let mut built = Vec::new();
        for space in self.spaces.clone() {
            built.extend(self.index_space(&space).await);
        }
        *self.index.write().expect("wiki index lock poisoned") = built;
        Ok(())
    }

    async fn search(&self, query: &str, filters: &Filter) -> AdapterResult<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let limit = filters.limit.unwrap_or(20);

        if self
            .supports_native_search
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            let path = format!("/search?q={}", urlencoding_lite(query));
            match self.fetch(path, true).await {
                Ok(body) => {
                    if let Ok(page) = serde_json::from_str::<PageList>(&body) {
                        let mut docs = Vec::new();
                        for p in page.results.into_iter().take(limit) {
                            let content = self
                                .fetch(format!("/pages/{}", p.id), false)
                                .await
                                .ok()
                                .and_then(|b| serde_json::from_str::<PageBody>(&b).ok())
                                .map(|b| b.content)
                                .unwrap_or_default();
                            docs.push(Document {
                                id: format!("{}:{}", self.name, p.id),
                                title: p.title.clone(),
                                excerpt: content.chars().take(240).collect(),
                                content,
                                source_name: self.name.clone(),
                                source_kind: pp_types::SourceKind::Wiki,
                                category: infer_category(&p.title),
                                confidence: 0.8,
                                match_reasons: vec!["native search".into()],
                                retrieval_time_ms: start.elapsed().as_millis() as u64,
                                last_updated: p.updated_at,
                                url: Some(format!("{}/pages/{}", self.base_url, p.id)),
                                metadata: Default::default(),
                            });
                        }
                        return Ok(docs);
                    }
                }
                Err(AdapterError::NotFound) => {
                    self.supports_native_search
                        .store(false, std::sync::atomic::Ordering::Relaxed);
                }
                Err(e) => return Err(e),
            }
        }

        // Fallback: fuzzy scan of the locally built index.
        let mut scored: Vec<(f64, IndexedPage)> = self
            .snapshot()
            .into_iter()
            .filter(|p| filters.matches_age_and_category(p.category, p.last_updated))
            .map(|p| (support::fuzzy_score(query, &p.title), p))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut docs = Vec::new();
        for (score, page) in scored.into_iter().take(limit) {
            let content = self
                .fetch(format!("/pages/{}", page.id), false)
                .await
                .ok()
                .and_then(|b| serde_json::from_str::<PageBody>(&b).ok())
                .map(|b| b.content)
                .unwrap_or_default();
            docs.push(Document {
                id: format!("{}:{}", self.name, page.id),
                title: page.title.clone(),
                excerpt: content.chars().take(240).collect(),
                content,
                source_name: self.name.clone(),
                source_kind: pp_types::SourceKind::Wiki,
                category: page.category,
                confidence: score,
                match_reasons: vec!["title match (fallback scan)".into()],
                retrieval_time_ms: start.elapsed().as_millis() as u64,
                last_updated: page.last_updated,
                url: Some(format!("{}/pages/{}", self.base_url, page.id)),
                metadata: Default::default(),
            });
        }
        Ok(docs)
    }

    async fn get(&self, id: &str) -> AdapterResult<Document> {
        let page = self
            .snapshot()
            .into_iter()
            .find(|p| format!("{}:{}", self.name, p.id) == id)
            .ok_or(AdapterError::NotFound)?;
        let body = self.fetch(format!("/pages/{}", page.id), false).await?;
        let content = serde_json::from_str::<PageBody>(&body)
            .map(|b| b.content)
            .unwrap_or_default();
        Ok(Document {
            id: id.to_string(),
            title: page.title,
            excerpt: content.chars().take(240).collect(),
            content,
            source_name: self.name.clone(),
            source_kind: pp_types::SourceKind::Wiki,
            category: page.category,
            confidence: 1.0,
            match_reasons: vec!["direct lookup".into()],
            retrieval_time_ms: 0,
            last_updated: page.last_updated,
            url: Some(format!("{}/pages/{}", self.base_url, page.id)),
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
        for page in self.snapshot() {
            if page.category != Category::Runbook {
                continue;
            }
            let body = self
                .fetch(format!("/pages/{}", page.id), false)
                .await
                .unwrap_or_default();
            let content = serde_json::from_str::<PageBody>(&body)
                .map(|b| b.content)
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
                id: format!("{}:{}", self.name, page.id),
                title: page.title,
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
        let Some(space) = self.spaces.first() else {
            return HealthCheck::unhealthy(self.name.clone(), "no spaces configured");
        };
        match self.fetch(format!("/spaces/{space}/pages"), false).await {
            Ok(_) => HealthCheck::healthy(self.name.clone(), start.elapsed().as_millis() as u64),
            Err(e) => HealthCheck::unhealthy(self.name.clone(), e.to_string()),
        }
    }

    async fn refresh_index(&self, _force: bool) -> bool {
        let mut built = Vec::new();
        for space in self.spaces.clone() {
            built.extend(self.index_space(&space).await);
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
        let mut m = AdapterMetadata::new(self.name.clone(), pp_types::SourceKind::Wiki);
        m.document_count = self.snapshot().len();
        m
    }

    async fn cleanup(&self) {
        if let Ok(mut guard) = self.index.write() {
            guard.clear();
        }
        let _ = (&self.client, &self.timeout, &self.auth);
    }
}

/// Minimal query-string escaping; wiki search endpoints only ever see the
/// user's free-text query here, never a full URL.
fn urlencoding_lite(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') => c.to_string(),
            c => format!("%{:02X}", c as u32),
        })
        .collect()
}
