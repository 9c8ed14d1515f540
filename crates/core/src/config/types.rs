use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub applicant: ApplicantConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tracking: TrackingConfig::default(),
            poller: PollerConfig::default(),
            source: SourceConfig::default(),
            telegram: None,
            email: None,
            document: DocumentConfig::default(),
            applicant: ApplicantConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    10000
}

/// Which trustees are watched and how far back lots are considered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Trustee names searched on every cycle.
    #[serde(default = "default_trustees")]
    pub trustees: Vec<String>,
    /// Lots published before this date are ignored.
    #[serde(default = "default_min_publish_date")]
    pub min_publish_date: NaiveDate,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            trustees: default_trustees(),
            min_publish_date: default_min_publish_date(),
        }
    }
}

fn default_trustees() -> Vec<String> {
    [
        "Мурдашева Алсу Ишбулатновна",
        "Калашникова Наталья Александровна",
        "Закиров Тимур Назифович",
        "Фамиев Ильнур Илдусович",
        "Галеева Алина Рифмеровна",
        "Тихонова Кристина Александровна",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_min_publish_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 22).unwrap_or_default()
}

/// Poll loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    /// Pause between two cycles (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Pause after a cycle in which the lot source was unreachable (seconds).
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    /// Seen-set file (JSON array of lot ids).
    #[serde(default = "default_seen_file")]
    pub seen_file: PathBuf,

    /// Stop after this many cycles. Unset means run until signalled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u32>,
}

fn default_interval() -> u64 {
    300 // 5 minutes
}

fn default_error_backoff() -> u64 {
    900 // 15 minutes
}

fn default_seen_file() -> PathBuf {
    PathBuf::from("seen_cases.json")
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            error_backoff_secs: default_error_backoff(),
            seen_file: default_seen_file(),
            max_cycles: None,
        }
    }
}

/// Lot source configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Source backend type
    #[serde(default)]
    pub backend: SourceBackend,
    /// Page scraper settings (used when backend = "fedresurs")
    #[serde(default)]
    pub fedresurs: FedresursConfig,
    /// API settings (required when backend = "api")
    #[serde(default)]
    pub api: Option<ApiSourceConfig>,
}

/// Available lot source backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceBackend {
    #[default]
    Fedresurs,
    Api,
    /// No polling; only the HTTP surface runs.
    Disabled,
}

impl SourceBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceBackend::Fedresurs => "fedresurs",
            SourceBackend::Api => "api",
            SourceBackend::Disabled => "disabled",
        }
    }
}

/// Trade-listing page scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FedresursConfig {
    #[serde(default = "default_fedresurs_url")]
    pub base_url: String,
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u32,
    /// Minimum spacing between two page requests (milliseconds).
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FedresursConfig {
    fn default() -> Self {
        Self {
            base_url: default_fedresurs_url(),
            timeout_secs: default_scrape_timeout(),
            request_delay_ms: default_request_delay(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fedresurs_url() -> String {
    "https://bankrot.fedresurs.ru".to_string()
}

fn default_scrape_timeout() -> u32 {
    30
}

fn default_request_delay() -> u64 {
    2000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Bankruptcy data API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSourceConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    /// Request timeout in seconds (default: 120)
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u32,
    /// Value of the `type` parameter for the per-trustee listing request.
    #[serde(default = "default_search_type")]
    pub search_type: String,
    /// Query parameter carrying the trustee name.
    #[serde(default = "default_search_param")]
    pub search_param: String,
}

impl Default for ApiSourceConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token: String::new(),
            timeout_secs: default_api_timeout(),
            search_type: default_search_type(),
            search_param: default_search_param(),
        }
    }
}

fn default_api_url() -> String {
    "https://api-cloud.ru/api/bankrot.php".to_string()
}

fn default_api_timeout() -> u32 {
    120
}

fn default_search_type() -> String {
    "searchTrades".to_string()
}

fn default_search_param() -> String {
    "arbitrManager".to_string()
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u32,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> u32 {
    30
}

/// SMTP configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to `username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u32,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.to.is_empty()
    }

    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

fn default_smtp_host() -> String {
    "connect.smtp.bz".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> u32 {
    120
}

/// Application document rendering configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    /// TTF font with Cyrillic glyphs.
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    /// Directory for rendered files (deleted after mailing).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_font_path() -> PathBuf {
    PathBuf::from("SFProText-Regular.ttf")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Applicant details printed on the application form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicantConfig {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub full_name: Option<String>,
    /// Surname with initials, used on the signature line.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub short_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub passport_series: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub passport_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub residence_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub inn: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ogrnip: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ogrnip_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub email: Option<String>,
}

/// Env values such as `INN=7701234567` arrive as numbers; the config keeps them as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<Scalar>::deserialize(deserializer).map(|s| s.map(Scalar::into_string))
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub tracking: TrackingConfig,
    pub poller: PollerConfig,
    pub source: SanitizedSourceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<SanitizedTelegramConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<SanitizedEmailConfig>,
    pub document: DocumentConfig,
}

/// Sanitized source config (API token redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourceConfig {
    pub backend: String,
    pub fedresurs_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub api_token_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub api_base: String,
    pub bot_token_configured: bool,
    pub chat_id_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from: String,
    pub to: String,
    pub password_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            tracking: config.tracking.clone(),
            poller: config.poller.clone(),
            document: config.document.clone(),
            source: SanitizedSourceConfig {
                backend: config.source.backend.as_str().to_string(),
                fedresurs_url: config.source.fedresurs.base_url.clone(),
                api_url: config.source.api.as_ref().map(|a| a.url.clone()),
                api_token_configured: config
                    .source
                    .api
                    .as_ref()
                    .is_some_and(|a| !a.token.is_empty()),
            },
            telegram: config.telegram.as_ref().map(|t| SanitizedTelegramConfig {
                api_base: t.api_base.clone(),
                bot_token_configured: !t.bot_token.is_empty(),
                chat_id_configured: !t.chat_id.is_empty(),
            }),
            email: config.email.as_ref().map(|e| SanitizedEmailConfig {
                smtp_host: e.smtp_host.clone(),
                smtp_port: e.smtp_port,
                from: e.sender().to_string(),
                to: e.to.clone(),
                password_configured: !e.password.is_empty(),
            }),
        }
    }
}
