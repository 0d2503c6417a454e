//! Configuration loaded from the environment.
//!
//! Required values have no defaults. Everything is validated before the
//! first network call so a bad deployment fails fast.

use crate::error::ConfigError;
use crate::TableRef;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_SHEET_NAME: &str = "travelDestinations";
pub const DEFAULT_STATE_CELL: &str = "A1";
pub const DEFAULT_STATE_FILE: &str = "flightboard-state.json";
pub const DEFAULT_HEADER_ROWS: usize = 2;
pub const DEFAULT_MIN_COLUMNS: usize = 7;
pub const DEFAULT_TITLE: &str = "✈️ Smugglers Flight Paths";
pub const DEFAULT_FOOTER: &str = "Auto-updates via GitHub Actions";
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INITIAL_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_MS: u64 = 30_000;
pub const DEFAULT_RETRY_MULTIPLIER: f32 = 2.0;

// ============================================================================
// SECRETS
// ============================================================================

/// Credential wrapper that never prints its value.
#[derive(Clone)]
pub struct ApiToken(SecretString);

impl ApiToken {
    /// Wrap a token. Empty or whitespace-only tokens are rejected.
    pub fn new(field: &str, token: String) -> Result<Self, ConfigError> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: field.to_string(),
            });
        }
        Ok(Self(SecretString::new(token.into())))
    }

    /// Expose the token (only when building an auth header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiToken([REDACTED, {} chars])", self.0.expose_secret().len())
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Where the last posted message id lives between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBackend {
    /// A cell of the source worksheet, in A1 notation.
    SheetCell { cell: String },
    /// A local JSON file.
    File { path: PathBuf },
}

/// Retry configuration for transport calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Also caps server-provided wait hints.
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_RETRY_INITIAL_MS),
            max_backoff: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
            backoff_multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

/// Rendering policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Leading rows (state slot and header) skipped before rendering.
    pub header_rows: usize,
    /// Rows with fewer cells are skipped.
    pub min_columns: usize,
    pub sort_by_name: bool,
    pub title: String,
    pub footer: String,
    /// Destination name to prefix overrides, merged over the built-in table.
    pub prefix_overrides: Vec<(String, String)>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            min_columns: DEFAULT_MIN_COLUMNS,
            sort_by_name: true,
            title: DEFAULT_TITLE.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
            prefix_overrides: Vec::new(),
        }
    }
}

/// Endpoints and credentials for the HTTP collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub discord_token: ApiToken,
    pub channel_id: u64,
    pub discord_api_base: String,
    pub google_access_token: ApiToken,
    pub sheets_api_base: String,
    pub request_timeout: Duration,
}

/// Master configuration.
#[derive(Debug, Clone)]
pub struct FlightboardConfig {
    pub table: TableRef,
    pub state: StateBackend,
    pub render: RenderConfig,
    pub retry: RetryConfig,
    pub client: ClientConfig,
}

// ============================================================================
// LOADING
// ============================================================================

impl FlightboardConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Environment Variables
    /// - `DISCORD_TOKEN`, `FLIGHT_CHANNEL_ID`, `SPREADSHEET_ID`,
    ///   `GOOGLE_ACCESS_TOKEN`: required
    /// - `FLIGHT_SHEET`: worksheet name (default: travelDestinations)
    /// - `FLIGHTBOARD_STATE_BACKEND`: `sheet` or `file` (default: sheet)
    /// - `FLIGHTBOARD_STATE_CELL` / `FLIGHTBOARD_STATE_FILE`: slot location
    /// - `FLIGHTBOARD_HEADER_ROWS`, `FLIGHTBOARD_MIN_COLUMNS`,
    ///   `FLIGHTBOARD_SORT_BY_NAME`, `FLIGHTBOARD_TITLE`,
    ///   `FLIGHTBOARD_FOOTER`, `FLIGHTBOARD_PREFIXES`: rendering
    /// - `FLIGHTBOARD_DISCORD_API_BASE`, `FLIGHTBOARD_SHEETS_API_BASE`,
    ///   `FLIGHTBOARD_REQUEST_TIMEOUT_MS`: clients
    /// - `FLIGHTBOARD_RETRY_MAX_ATTEMPTS`, `FLIGHTBOARD_RETRY_INITIAL_MS`,
    ///   `FLIGHTBOARD_RETRY_MAX_MS`, `FLIGHTBOARD_RETRY_MULTIPLIER`: retries
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, then validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| ConfigError::MissingRequired {
                field: key.to_string(),
            })
        };

        let discord_token = ApiToken::new("DISCORD_TOKEN", required("DISCORD_TOKEN")?)?;
        let channel_id = parse_value::<u64>("FLIGHT_CHANNEL_ID", &required("FLIGHT_CHANNEL_ID")?)?;
        let spreadsheet_id = required("SPREADSHEET_ID")?;
        let google_access_token =
            ApiToken::new("GOOGLE_ACCESS_TOKEN", required("GOOGLE_ACCESS_TOKEN")?)?;

        let sheet_name = get("FLIGHT_SHEET").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());

        let state = match get("FLIGHTBOARD_STATE_BACKEND")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("sheet") => StateBackend::SheetCell {
                cell: get("FLIGHTBOARD_STATE_CELL")
                    .map(|c| c.trim().to_ascii_uppercase())
                    .unwrap_or_else(|| DEFAULT_STATE_CELL.to_string()),
            },
            Some("file") => StateBackend::File {
                path: get("FLIGHTBOARD_STATE_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "FLIGHTBOARD_STATE_BACKEND".to_string(),
                    value: other.to_string(),
                    reason: "expected 'sheet' or 'file'".to_string(),
                })
            }
        };

        let render = RenderConfig {
            header_rows: optional_value("FLIGHTBOARD_HEADER_ROWS", get("FLIGHTBOARD_HEADER_ROWS"))?
                .unwrap_or(DEFAULT_HEADER_ROWS),
            min_columns: optional_value("FLIGHTBOARD_MIN_COLUMNS", get("FLIGHTBOARD_MIN_COLUMNS"))?
                .unwrap_or(DEFAULT_MIN_COLUMNS),
            sort_by_name: match get("FLIGHTBOARD_SORT_BY_NAME") {
                Some(v) => parse_bool("FLIGHTBOARD_SORT_BY_NAME", &v)?,
                None => true,
            },
            title: get("FLIGHTBOARD_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            footer: get("FLIGHTBOARD_FOOTER").unwrap_or_else(|| DEFAULT_FOOTER.to_string()),
            prefix_overrides: match get("FLIGHTBOARD_PREFIXES") {
                Some(v) => parse_prefix_overrides(&v)?,
                None => Vec::new(),
            },
        };

        let retry = RetryConfig {
            max_attempts: optional_value(
                "FLIGHTBOARD_RETRY_MAX_ATTEMPTS",
                get("FLIGHTBOARD_RETRY_MAX_ATTEMPTS"),
            )?
            .unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS),
            initial_backoff: Duration::from_millis(
                optional_value("FLIGHTBOARD_RETRY_INITIAL_MS", get("FLIGHTBOARD_RETRY_INITIAL_MS"))?
                    .unwrap_or(DEFAULT_RETRY_INITIAL_MS),
            ),
            max_backoff: Duration::from_millis(
                optional_value("FLIGHTBOARD_RETRY_MAX_MS", get("FLIGHTBOARD_RETRY_MAX_MS"))?
                    .unwrap_or(DEFAULT_RETRY_MAX_MS),
            ),
            backoff_multiplier: optional_value(
                "FLIGHTBOARD_RETRY_MULTIPLIER",
                get("FLIGHTBOARD_RETRY_MULTIPLIER"),
            )?
            .unwrap_or(DEFAULT_RETRY_MULTIPLIER),
        };

        let client = ClientConfig {
            discord_token,
            channel_id,
            discord_api_base: get("FLIGHTBOARD_DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            google_access_token,
            sheets_api_base: get("FLIGHTBOARD_SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            request_timeout: Duration::from_millis(
                optional_value(
                    "FLIGHTBOARD_REQUEST_TIMEOUT_MS",
                    get("FLIGHTBOARD_REQUEST_TIMEOUT_MS"),
                )?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
        };

        let config = Self {
            table: TableRef::new(spreadsheet_id, sheet_name),
            state,
            render,
            retry,
            client,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - channel id, min_columns, max_attempts and timeout are non-zero
    /// - backoff multiplier >= 1.0 and max_backoff >= initial_backoff
    /// - API bases are http(s) URLs
    /// - a sheet state cell is well-formed and lies within the header rows
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.channel_id == 0 {
            return Err(invalid("FLIGHT_CHANNEL_ID", "0", "must be non-zero"));
        }
        if self.table.sheet_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "FLIGHT_SHEET".to_string(),
            });
        }
        if self.render.min_columns == 0 {
            return Err(invalid("FLIGHTBOARD_MIN_COLUMNS", "0", "must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("FLIGHTBOARD_RETRY_MAX_ATTEMPTS", "0", "must be > 0"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(invalid(
                "FLIGHTBOARD_RETRY_MULTIPLIER",
                &self.retry.backoff_multiplier.to_string(),
                "must be >= 1.0",
            ));
        }
        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(invalid(
                "FLIGHTBOARD_RETRY_MAX_MS",
                &self.retry.max_backoff.as_millis().to_string(),
                "must be >= FLIGHTBOARD_RETRY_INITIAL_MS",
            ));
        }
        if self.client.request_timeout.is_zero() {
            return Err(invalid("FLIGHTBOARD_REQUEST_TIMEOUT_MS", "0", "must be > 0"));
        }
        for (field, base) in [
            ("FLIGHTBOARD_DISCORD_API_BASE", &self.client.discord_api_base),
            ("FLIGHTBOARD_SHEETS_API_BASE", &self.client.sheets_api_base),
        ] {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(invalid(field, base, "must be an http(s) URL"));
            }
        }
        if let StateBackend::SheetCell { cell } = &self.state {
            let row = cell_row(cell).ok_or_else(|| {
                invalid("FLIGHTBOARD_STATE_CELL", cell, "must be a single cell like A1")
            })?;
            if row > self.render.header_rows {
                return Err(ConfigError::IncompatibleOptions {
                    option_a: format!("FLIGHTBOARD_STATE_CELL={}", cell),
                    option_b: format!("FLIGHTBOARD_HEADER_ROWS={}", self.render.header_rows),
                });
            }
        }
        Ok(())
    }
}

/// 1-based row number of an A1-notation cell, if well-formed.
pub fn cell_row(cell: &str) -> Option<usize> {
    let letters = cell.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return None;
    }
    let digits = &cell[letters..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|row| *row > 0)
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid(field, value, "could not be parsed"))
}

fn optional_value<T: std::str::FromStr>(
    field: &str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value.map(|v| parse_value(field, &v)).transpose()
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(field, value, "expected true or false")),
    }
}

/// Parse `Name=prefix;Other Name=prefix` pairs.
fn parse_prefix_overrides(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, prefix)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), prefix.trim().to_string()))
            }
            _ => Err(invalid("FLIGHTBOARD_PREFIXES", pair, "expected Name=prefix")),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DISCORD_TOKEN", "bot-token".to_string()),
            ("FLIGHT_CHANNEL_ID", "1458203844474572801".to_string()),
            ("SPREADSHEET_ID", "sheet-key".to_string()),
            ("GOOGLE_ACCESS_TOKEN", "ya29.token".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<FlightboardConfig, ConfigError> {
        FlightboardConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.table.sheet_name, DEFAULT_SHEET_NAME);
        assert_eq!(config.table.spreadsheet_id, "sheet-key");
        assert_eq!(
            config.state,
            StateBackend::SheetCell {
                cell: "A1".to_string()
            }
        );
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.client.channel_id, 1458203844474572801);
        assert_eq!(config.client.discord_api_base, DEFAULT_DISCORD_API_BASE);
    }

    #[test]
    fn test_missing_required_fields() {
        for key in [
            "DISCORD_TOKEN",
            "FLIGHT_CHANNEL_ID",
            "SPREADSHEET_ID",
            "GOOGLE_ACCESS_TOKEN",
        ] {
            let mut env = base_env();
            env.remove(key);
            match load(&env) {
                Err(ConfigError::MissingRequired { field }) => assert_eq!(field, key),
                other => panic!("expected MissingRequired for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_token_is_missing() {
        let mut env = base_env();
        env.insert("DISCORD_TOKEN", "   ".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_non_numeric_channel_rejected() {
        let mut env = base_env();
        env.insert("FLIGHT_CHANNEL_ID", "general".to_string());
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_file_backend() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_STATE_BACKEND", "File".to_string());
        env.insert("FLIGHTBOARD_STATE_FILE", "/var/lib/flightboard/state.json".to_string());
        let config = load(&env).unwrap();
        assert_eq!(
            config.state,
            StateBackend::File {
                path: PathBuf::from("/var/lib/flightboard/state.json")
            }
        );
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_STATE_BACKEND", "redis".to_string());
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_state_cell_must_sit_in_header_rows() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_STATE_CELL", "b5".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::IncompatibleOptions { .. })
        ));

        env.insert("FLIGHTBOARD_HEADER_ROWS", "5".to_string());
        let config = load(&env).unwrap();
        assert_eq!(
            config.state,
            StateBackend::SheetCell {
                cell: "B5".to_string()
            }
        );
    }

    #[test]
    fn test_retry_validation() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_RETRY_MAX_ATTEMPTS", "0".to_string());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("FLIGHTBOARD_RETRY_MULTIPLIER", "0.5".to_string());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("FLIGHTBOARD_RETRY_INITIAL_MS", "5000".to_string());
        env.insert("FLIGHTBOARD_RETRY_MAX_MS", "100".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_render_options() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_SORT_BY_NAME", "off".to_string());
        env.insert("FLIGHTBOARD_MIN_COLUMNS", "4".to_string());
        env.insert("FLIGHTBOARD_HEADER_ROWS", "1".to_string());
        env.insert("FLIGHTBOARD_PREFIXES", "Torn=<:city:1>; Mexico = MX ;".to_string());
        let config = load(&env).unwrap();
        assert!(!config.render.sort_by_name);
        assert_eq!(config.render.min_columns, 4);
        assert_eq!(config.render.header_rows, 1);
        assert_eq!(
            config.render.prefix_overrides,
            vec![
                ("Torn".to_string(), "<:city:1>".to_string()),
                ("Mexico".to_string(), "MX".to_string()),
            ]
        );
    }

    #[test]
    fn test_bad_prefix_override_rejected() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_PREFIXES", "Torn".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_api_base_must_be_url() {
        let mut env = base_env();
        env.insert("FLIGHTBOARD_DISCORD_API_BASE", "discord.com".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_token_debug_redacted() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("bot-token"));
        assert!(!debug.contains("ya29.token"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(config.client.discord_token.expose(), "bot-token");
    }

    #[test]
    fn test_cell_row() {
        assert_eq!(cell_row("A1"), Some(1));
        assert_eq!(cell_row("AB12"), Some(12));
        assert_eq!(cell_row("A0"), None);
        assert_eq!(cell_row("1"), None);
        assert_eq!(cell_row("A"), None);
        assert_eq!(cell_row("A1:B2"), None);
    }
}
