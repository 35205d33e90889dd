//! Declarative source configuration (§3 `SourceConfig`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The kind of backend a source adapter talks to.
///
/// A closed tagged variant rather than an open-ended string: adapter
/// behavior is keyed off this, and the registry's factory map is keyed by
/// it too, so an unknown kind is a config error caught at load time rather
/// than a runtime surprise inside an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    GitHost,
    Wiki,
    Database,
    Web,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::GitHost => "git_host",
            SourceKind::Wiki => "wiki",
            SourceKind::Database => "database",
            SourceKind::Web => "web",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific settings, carried as a variant payload tagged by
/// [`SourceKind`] rather than as untyped key-value pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    File {
        /// Root directories to walk.
        roots: Vec<String>,
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
        #[serde(default = "default_max_depth")]
        max_depth: usize,
        #[serde(default)]
        watch: bool,
    },
    GitHost {
        base_url: String,
        #[serde(default)]
        repositories: Vec<String>,
        #[serde(default)]
        include_issues: bool,
        #[serde(default)]
        include_pull_requests: bool,
        /// Fraction (0.0-1.0) of the remote's published rate quota this
        /// adapter is willing to spend.
        #[serde(default = "default_rate_budget_fraction")]
        rate_budget_fraction: f64,
        #[serde(default = "default_min_interval_ms")]
        min_request_interval_ms: u64,
    },
    Wiki {
        base_url: String,
        auth: WikiAuth,
        #[serde(default)]
        spaces: Vec<String>,
    },
    Database {
        connection_url: String,
        tables: Vec<TableMapping>,
        #[serde(default = "default_pool_size")]
        pool_size: u32,
        #[serde(default)]
        detect_schema: bool,
    },
    Web {
        endpoints: Vec<WebEndpoint>,
        #[serde(default)]
        respect_robots_txt: bool,
        #[serde(default = "default_rate_budget_fraction")]
        rate_budget_fraction: f64,
    },
}

fn default_max_depth() -> usize {
    8
}

fn default_rate_budget_fraction() -> f64 {
    0.8
}

fn default_min_interval_ms() -> u64 {
    250
}

fn default_pool_size() -> u32 {
    10
}

/// Authentication scheme for a wiki source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum WikiAuth {
    Bearer { token_env: String },
    OAuth { token_env: String },
    Basic { username: String, password_env: String },
    ApiKey { header: String, key_env: String },
}

/// A single table or collection exposed by a database source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMapping {
    pub table: String,
    pub title_field: String,
    pub content_field: String,
    pub category_field: Option<String>,
    pub updated_field: Option<String>,
    pub author_field: Option<String>,
}

/// A single endpoint exposed by a web source, with a content selector
/// appropriate to the endpoint's payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebEndpoint {
    pub url: String,
    pub selector: ContentSelector,
    pub pagination: Option<PaginationDescriptor>,
}

/// How to pull content out of one endpoint's response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ContentSelector {
    Html { css_selector: String },
    Json { pointer: String },
    Xml { xpath: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationDescriptor {
    pub next_page_selector: String,
    pub max_pages: u32,
}

/// An opaque reference to a credential: the name of an environment
/// variable holding the actual secret, resolved by the orchestrator at
/// startup, never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRef {
    pub env_var: String,
}

/// Declarative description of one source (§3).
///
/// `name` is unique across the process and immutable once an adapter has
/// been constructed from it; the registry enforces uniqueness at
/// `create_all` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(with = "duration_secs", default = "default_refresh_interval")]
    pub refresh_interval: Duration,
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    pub credentials: Option<CredentialRef>,
    pub settings: SourceSettings,
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

impl SourceConfig {
    pub fn kind_matches(&self, settings: &SourceSettings) -> bool {
        matches!(
            (self.kind, settings),
            (SourceKind::File, SourceSettings::File { .. })
                | (SourceKind::GitHost, SourceSettings::GitHost { .. })
                | (SourceKind::Wiki, SourceSettings::Wiki { .. })
                | (SourceKind::Database, SourceSettings::Database { .. })
                | (SourceKind::Web, SourceSettings::Web { .. })
        )
    }
}

/// Serializes a [`Duration`] as whole seconds. Config files read by humans
/// want `timeout = 10`, not a nested struct.
mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_through_display() {
        assert_eq!(SourceKind::GitHost.as_str(), "git_host");
        assert_eq!(SourceKind::GitHost.to_string(), "git_host");
    }

    #[test]
    fn settings_kind_must_match_declared_kind() {
        let cfg = SourceConfig {
            name: "docs".into(),
            kind: SourceKind::File,
            priority: 0,
            enabled: true,
            refresh_interval: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            max_retries: 1,
            credentials: None,
            settings: SourceSettings::File {
                roots: vec!["/docs".into()],
                include: vec![],
                exclude: vec![],
                max_depth: 4,
                watch: false,
            },
        };
        assert!(cfg.kind_matches(&cfg.settings));
    }

    #[test]
    fn deserializes_from_toml() {
        let toml_src = r#"
            name = "internal-wiki"
            kind = "wiki"
            priority = 1
            timeout = 15

            [settings]
            kind = "wiki"
            base_url = "https://wiki.example.com"
            spaces = ["OPS"]

            [settings.auth]
            scheme = "bearer"
            token_env = "WIKI_TOKEN"
        "#;
        let cfg: SourceConfig = toml::from_str(toml_src).expect("valid source config");
        assert_eq!(cfg.name, "internal-wiki");
        assert_eq!(cfg.timeout, Duration::from_secs(15));
        assert!(matches!(cfg.settings, SourceSettings::Wiki { .. }));
    }
}
