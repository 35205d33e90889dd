//! Generic web source adapter (§4.4 "Web").
//!
//! Each configured [`WebEndpoint`] declares its own content selector (HTML
//! CSS selector, JSON pointer, or — approximated, see below — an XML path)
//! and an optional [`PaginationDescriptor`]. `robots.txt` is honored when
//! `respect_robots_txt` is set; a disallowed endpoint is skipped and logged
//! rather than failing the whole source.
//!
//! No XPath evaluator is part of this workspace's dependency stack, so the
//! `Xml` selector is approximated by stripping tags and indexing the result
//! as plain text rather than addressing a specific node — adequate for
//! feeds that are mostly prose, a real limitation for deeply structured XML.

use crate::support::{self, acquire_rate_permit, infer_category};
use async_trait::async_trait;
use chrono::Utc;
use pp_adapter::{AdapterError, AdapterMetadata, AdapterResult, SourceAdapter};
use pp_ratelimiter::RateLimiterConfigBuilder;
use pp_types::{Category, ContentSelector, Document, Filter, HealthCheck, Runbook, Severity, WebEndpoint};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct IndexedItem {
    id: String,
    url: String,
    title: String,
    content: String,
    category: Category,
}

pub struct WebAdapter {
    name: String,
    endpoints: Vec<WebEndpoint>,
    respect_robots_txt: bool,
    rate_limiter: pp_ratelimiter::RateLimiterLayer,
    client: Client,
    timeout: Duration,
    disallowed: RwLock<HashSet<String>>,
    index: RwLock<Vec<IndexedItem>>,
}

impl WebAdapter {
    pub fn new(
        name: impl Into<String>,
        endpoints: Vec<WebEndpoint>,
        respect_robots_txt: bool,
        rate_budget_fraction: f64,
        timeout: Duration,
    ) -> Self {
        let name = name.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let rate_limiter = RateLimiterConfigBuilder::of_remote_quota(
            600,
            rate_budget_fraction,
            Duration::from_secs(60),
        )
        .timeout_duration(Duration::from_millis(50))
        .name(format!("{name}-quota"))
        .build();

        Self {
            name,
            endpoints,
            respect_robots_txt,
            rate_limiter,
            client,
            timeout,
            disallowed: RwLock::new(HashSet::new()),
            index: RwLock::new(Vec::new()),
        }
    }

    fn snapshot(&self) -> Vec<IndexedItem> {
        self.index.read().expect("web index lock poisoned").clone()
    }

    async fn check_robots(&self, url: &str) {
        if !self.respect_robots_txt {
            return;
        }
        let Ok(parsed) = url::Url::parse(url) else {
            return;
        };
        let robots_url = format!(
            "{}://{}/robots.txt",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default()
        );
        let Ok(resp) = self.client.get(&robots_url).send().await else {
            return;
        };
        let Ok(body) = resp.text().await else {
            return;
        };
        let path = parsed.path();
        for line in body.lines() {
            let line = line.trim();
            if let Some(rule) = line.strip_prefix("Disallow:") {
                let rule = rule.trim();
                if !rule.is_empty() && path.starts_with(rule) {
                    self.disallowed
                        .write()
                        .expect("web disallow-set lock poisoned")
                        .insert(url.to_string());
                }
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> AdapterResult<String> {
        acquire_rate_permit(&self.rate_limiter).await?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("web request failed: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AdapterError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(AdapterError::Unavailable(format!(
                "web endpoint returned {}",
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("reading web response: {e}")))
    }

    async fn index_endpoint(&self, endpoint: &WebEndpoint) -> Vec<IndexedItem> {
        self.check_robots(&endpoint.url).await;
        if self
            .disallowed
            .read()
            .expect("web disallow-set lock poisoned")
            .contains(&endpoint.url)
        {
            return Vec::new();
        }

        let max_pages = endpoint
            .pagination
            .as_ref()
            .map(|p| p.max_pages.max(1))
            .unwrap_or(1);

        let mut items = Vec::new();
        let mut next_url = Some(endpoint.url.clone());
        let mut visited = 0u32;

        while let Some(url) = next_url.take() {
            if visited >= max_pages {
                break;
            }
            visited += 1;

            let Ok(body) = self.fetch_page(&url).await else {
                break;
            };
            items.extend(extract_items(&self.name, &url, &endpoint.selector, &body));

            if let Some(pagination) = &endpoint.pagination {
                next_url = extract_next_page(&endpoint.selector, &body, &pagination.next_page_selector);
            }
        }
        items
    }
}

fn extract_items(source_name: &str, url: &str, selector: &ContentSelector, body: &str) -> Vec<IndexedItem> {
    match selector {
        ContentSelector::Html { css_selector } => extract_html(source_name, url, css_selector, body),
        ContentSelector::Json { pointer } => extract_json(source_name, url, pointer, body),
        ContentSelector::Xml { xpath: _ } => vec![IndexedItem {
            id: format!("{source_name}:{url}"),
            url: url.to_string(),
            title: url.to_string(),
            content: strip_tags(body),
            category: Category::General,
        }],
    }
}

fn extract_html(source_name: &str, url: &str, css_selector: &str, body: &str) -> Vec<IndexedItem> {
    let Ok(selector) = Selector::parse(css_selector) else {
        return Vec::new();
    };
    let doc = Html::parse_document(body);
    doc.select(&selector)
        .enumerate()
        .map(|(i, el)| {
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            let title = text.chars().take(80).collect::<String>();
            IndexedItem {
                id: format!("{source_name}:{url}#{i}"),
                url: url.to_string(),
                title: if title.is_empty() { url.to_string() } else { title },
                category: infer_category(&text),
                content: text,
            }
        })
        .collect()
}

fn extract_json(source_name: &str, url: &str, pointer: &str, body: &str) -> Vec<IndexedItem> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };
    let pointed = value.pointer(pointer).cloned().unwrap_or(value);
    let entries: Vec<serde_json::Value> = match pointed {
        serde_json::Value::Array(arr) => arr,
        other => vec![other],
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let title = entry
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(url)
                .to_string();
            let content = entry
                .get("content")
                .or_else(|| entry.get("body"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| entry.to_string());
            IndexedItem {
                id: format!("{source_name}:{url}#{i}"),
                url: url.to_string(),
                category: infer_category(&title),
                title,
                content,
            }
        })
        .collect()
}

fn extract_next_page(selector: &ContentSelector, body: &str, next_page_selector: &str) -> Option<String> {
    if let ContentSelector::Html { .. } = selector {
        let sel = Selector::parse(next_page_selector).ok()?;
        let doc = Html::parse_document(body);
        doc.select(&sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
    } else {
        None
    }
}

fn strip_tags(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[async_trait]
impl SourceAdapter for WebAdapter {
    async fn initialize(&self) -> AdapterResult<()> {
        if self.endpoints.is_empty() {
            return Err(AdapterError::ConfigError(
                "web source has no configured endpoints".into(),
            ));
        }
        let mut built = Vec::new();
        for endpoint in self.endpoints.clone() {
            built.extend(self.index_endpoint(&endpoint).await);
        }
        *self.index.write().expect("web index lock poisoned") = built;
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
            .filter(|it| filters.matches_age_and_category(it.category, Utc::now()))
            .map(|it| (support::fuzzy_score(query, &it.title), it))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let limit = filters.limit.unwrap_or(20);

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, item)| Document {
                id: item.id,
                title: item.title.clone(),
                excerpt: item.content.chars().take(240).collect(),
                content: item.content,
                source_name: self.name.clone(),
                source_kind: pp_types::SourceKind::Web,
                category: item.category,
                confidence: score,
                match_reasons: vec!["title match".into()],
                retrieval_time_ms: start.elapsed().as_millis() as u64,
                last_updated: Utc::now(),
                url: Some(item.url),
                metadata: Default::default(),
            })
            .collect())
    }

    async fn get(&self, id: &str) -> AdapterResult<Document> {
        let item = self
            .snapshot()
            .into_iter()
            .find(|it| it.id == id)
            .ok_or(AdapterError::NotFound)?;
        Ok(Document {
            id: item.id,
            title: item.title,
            excerpt: item.content.chars().take(240).collect(),
            content: item.content,
            source_name: self.name.clone(),
            source_kind: pp_types::SourceKind::Web,
            category: item.category,
            confidence: 1.0,
            match_reasons: vec!["direct lookup".into()],
            retrieval_time_ms: 0,
            last_updated: Utc::now(),
            url: Some(item.url),
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
            if !item.content.to_lowercase().contains(&alert_type.to_lowercase()) {
                continue;
            }
            let procedures = item
                .content
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
                metadata: pp_types::RunbookMetadata {
                    confidence: 0.6,
                    success_rate: 0.5,
                    avg_resolution_minutes: 0.0,
                },
            });
        }
        Ok(runbooks)
    }

    async fn healthcheck(&self) -> HealthCheck {
        let start = Instant::now();
        let Some(endpoint) = self.endpoints.first() else {
            return HealthCheck::unhealthy(self.name.clone(), "no endpoints configured");
        };
        match self.client.get(&endpoint.url).send().await {
            Ok(resp) if resp.status().is_success() => {
                HealthCheck::healthy(self.name.clone(), start.elapsed().as_millis() as u64)
            }
            Ok(resp) => HealthCheck::unhealthy(self.name.clone(), format!("returned {}", resp.status())),
            Err(e) => HealthCheck::unhealthy(self.name.clone(), e.to_string()),
        }
    }

    async fn refresh_index(&self, _force: bool) -> bool {
        let mut built = Vec::new();
        for endpoint in self.endpoints.clone() {
            built.extend(self.index_endpoint(&endpoint).await);
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
        let mut m = AdapterMetadata::new(self.name.clone(), pp_types::SourceKind::Web);
        m.document_count = self.snapshot().len();
        m
    }

    async fn cleanup(&self) {
        if let Ok(mut guard) = self.index.write() {
            guard.clear();
        }
        let _ = (&self.client, &self.timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_html_splits_each_matched_element() {
        let body = "<html><body><div class=\"card\">first</div><div class=\"card\">second</div></body></html>";
        let items = extract_html("web", "https://example.com", "div.card", body);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content, "first");
    }

    #[test]
    fn extract_json_reads_pointed_array() {
        let body = r#"{"items": [{"title": "Disk space", "content": "free up /tmp"}]}"#;
        let items = extract_json("web", "https://example.com/api", "/items", body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Disk space");
    }

    #[test]
    fn strip_tags_removes_markup() {
        assert_eq!(strip_tags("<p>hello <b>world</b></p>"), "hello world");
    }

    #[tokio::test]
    async fn initialize_rejects_empty_endpoint_list() {
        let mut adapter = WebAdapter::new("web", vec![], false, 0.5, Duration::from_secs(5));
        assert!(matches!(
            adapter.initialize().await,
            Err(AdapterError::ConfigError(_))
        ));
    }
}
