use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Date format of `DIA_AGENDAMENTO` (e.g. 19/10/2026).
pub const SCHEDULE_DATE_FORMAT: &str = "%d/%m/%Y";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("{var} must be set when scheduling is enabled")]
    Missing { var: &'static str },

    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub output: OutputConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_total_pages")]
    pub total_pages: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Where the JSON and CSV exports land
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_json_file")]
    pub json_file: String,

    #[serde(default = "default_csv_file")]
    pub csv_file: String,
}

/// PDF proof-of-retrieval settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_snapshot_tool")]
    pub tool: String,

    #[serde(default = "default_snapshot_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_pipeline_log")]
    pub pipeline_file: String,

    #[serde(default = "default_storage_log")]
    pub storage_file: String,
}

/// Relational store. `host` set means PostgreSQL, otherwise a local DuckDB file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
}

/// Raw scheduling values, validated by [`ScheduleConfig::run_mode`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Immediate,
    Deferred { date: NaiveDate, time: NaiveTime },
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://quotes.toscrape.com".to_string()
}
fn default_total_pages() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "quotes-etl/0.1 (daily quote capture)".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("Dados_gerados")
}
fn default_json_file() -> String {
    "citacoes_json.json".to_string()
}
fn default_csv_file() -> String {
    "citacoes_csv.csv".to_string()
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("Screenshots")
}
fn default_snapshot_tool() -> String {
    "wkhtmltopdf".to_string()
}
fn default_snapshot_timeout_secs() -> u64 {
    60
}
fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_pipeline_log() -> String {
    "logs_do_sistema.log".to_string()
}
fn default_storage_log() -> String {
    "logs.log".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("Dados_gerados/citacoes.duckdb")
}
fn default_true() -> bool {
    true
}

// ── Loader ───────────────────────────────────────────────────────────────────

/// Unprefixed variables read from the environment / `.env`.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("schedule.enabled", "VERIFICA_AGENDAMENTO"),
    ("schedule.date", "DIA_AGENDAMENTO"),
    ("schedule.time", "HORA_AGENDAMENTO"),
    ("storage.name", "DB_NAME"),
    ("storage.user", "DB_USER"),
    ("storage.password", "DB_PASSWORD"),
    ("storage.host", "DB_HOST"),
    ("storage.port", "DB_PORT"),
];

impl AppConfig {
    /// Load configuration from files + environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut builder = ::config::Config::builder()
            .add_source(
                ::config::File::with_name("config/default")
                    .required(false)
                    .format(::config::FileFormat::Toml),
            )
            .add_source(
                ::config::File::with_name("config/local")
                    .required(false)
                    .format(::config::FileFormat::Toml),
            )
            .add_source(
                ::config::Environment::with_prefix("QUOTES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        // Every section has serde defaults, so empty tables are enough.
        let app_cfg: AppConfig = builder
            .set_default("scraper.base_url", default_base_url())?
            .set_default("output.data_dir", default_data_dir().to_string_lossy().to_string())?
            .set_default("snapshot.enabled", true)?
            .set_default("logging.dir", default_log_dir().to_string_lossy().to_string())?
            .set_default("storage.path", default_db_path().to_string_lossy().to_string())?
            .build()?
            .try_deserialize()?;

        app_cfg.validate()?;
        Ok(app_cfg)
    }

    /// Fail fast on anything that would only surface mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.scraper.base_url).map_err(|_| ConfigError::Invalid {
            var: "scraper.base_url",
            value: self.scraper.base_url.clone(),
            expected: "URL",
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "scraper.base_url",
                value: self.scraper.base_url.clone(),
                expected: "http(s) URL",
            });
        }

        if self.scraper.total_pages == 0 {
            return Err(ConfigError::Invalid {
                var: "scraper.total_pages",
                value: "0".into(),
                expected: "page count (>= 1)",
            });
        }

        self.storage.port()?;
        self.schedule.run_mode()?;
        Ok(())
    }

    pub fn json_path(&self) -> PathBuf {
        self.output.data_dir.join(&self.output.json_file)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output.data_dir.join(&self.output.csv_file)
    }
}

impl StorageConfig {
    pub fn port(&self) -> Result<Option<u16>, ConfigError> {
        match self.port.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(p) => p.parse().map(Some).map_err(|_| ConfigError::Invalid {
                var: "DB_PORT",
                value: p.to_string(),
                expected: "port number",
            }),
        }
    }

    pub fn uses_postgres(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.trim().is_empty())
    }
}

impl ScheduleConfig {
    pub fn run_mode(&self) -> Result<RunMode, ConfigError> {
        if !parse_flag(self.enabled.as_deref())? {
            return Ok(RunMode::Immediate);
        }

        let raw_date = required(self.date.as_deref(), "DIA_AGENDAMENTO")?;
        let date = NaiveDate::parse_from_str(raw_date, SCHEDULE_DATE_FORMAT).map_err(|_| {
            ConfigError::Invalid {
                var: "DIA_AGENDAMENTO",
                value: raw_date.to_string(),
                expected: "date (DD/MM/YYYY)",
            }
        })?;

        let raw_time = required(self.time.as_deref(), "HORA_AGENDAMENTO")?;
        let time = NaiveTime::parse_from_str(raw_time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw_time, "%H:%M:%S"))
            .map_err(|_| ConfigError::Invalid {
                var: "HORA_AGENDAMENTO",
                value: raw_time.to_string(),
                expected: "time of day (HH:MM)",
            })?;

        Ok(RunMode::Deferred { date, time })
    }
}

fn required<'a>(value: Option<&'a str>, var: &'static str) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { var }),
    }
}

/// Bool-like flag; unset counts as false.
fn parse_flag(value: Option<&str>) -> Result<bool, ConfigError> {
    let Some(raw) = value else { return Ok(false) };
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" | "nao" | "não" => Ok(false),
        "true" | "1" | "yes" | "sim" => Ok(true),
        _ => Err(ConfigError::Invalid {
            var: "VERIFICA_AGENDAMENTO",
            value: raw.to_string(),
            expected: "boolean",
        }),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                base_url: default_base_url(),
                total_pages: default_total_pages(),
                timeout_secs: default_timeout_secs(),
                user_agent: default_user_agent(),
            },
            output: OutputConfig {
                data_dir: default_data_dir(),
                json_file: default_json_file(),
                csv_file: default_csv_file(),
            },
            snapshot: SnapshotConfig {
                enabled: true,
                dir: default_snapshot_dir(),
                tool: default_snapshot_tool(),
                timeout_secs: default_snapshot_timeout_secs(),
            },
            logging: LoggingConfig {
                dir: default_log_dir(),
                pipeline_file: default_pipeline_log(),
                storage_file: default_storage_log(),
            },
            storage: StorageConfig {
                path: default_db_path(),
                name: None,
                user: None,
                password: None,
                host: None,
                port: None,
            },
            schedule: ScheduleConfig::default(),
        }
    }
}
