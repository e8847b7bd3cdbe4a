//! Loader for Cascade configuration with YAML + environment overlays.
//!
//! Sources merge in order: YAML files/snippets, then `CASCADE__`-prefixed
//! environment variables (`CASCADE__GATE__TIMEOUT_MS=30000`). After merging,
//! `${VAR}` placeholders in string values are expanded, so credentials for
//! setup steps can stay out of the file.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CascadeConfig {
    #[serde(default)]
    pub webdriver: WebDriverSettings,
    /// Page opened before setup steps run.
    #[serde(default)]
    pub start_url: Option<String>,
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default)]
    pub dropdown: DropdownSettings,
    /// Dependent levels, outermost first.
    pub levels: Vec<LevelSpec>,
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
pub struct WebDriverSettings {
    #[serde(default = "default_webdriver_url")]
    pub url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            headless: true,
        }
    }
}

/// Actions run once after opening `start_url`, e.g. a login form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SetupStep {
    Click { selector: String },
    Fill { selector: String, value: String },
    WaitIdle,
    Pause { ms: u64 },
}

#[derive(Debug, Deserialize)]
pub struct GateSettings {
    #[serde(default = "default_indicators")]
    pub indicators: Vec<String>,
    #[serde(default = "default_gate_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub settle_ms: u64,
}

impl GateSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            indicators: default_indicators(),
            timeout_ms: default_gate_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DropdownSettings {
    #[serde(default = "default_option_selector")]
    pub option_selector: String,
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    #[serde(default = "default_open_delay_ms")]
    pub open_delay_ms: u64,
    #[serde(default = "default_select_delay_ms")]
    pub select_delay_ms: u64,
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,
}

impl Default for DropdownSettings {
    fn default() -> Self {
        Self {
            option_selector: default_option_selector(),
            open_timeout_ms: default_open_timeout_ms(),
            open_delay_ms: default_open_delay_ms(),
            select_delay_ms: default_select_delay_ms(),
            close_delay_ms: default_close_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelSpec {
    /// Level id; also the result-table column checked during verification.
    pub id: String,
    /// Selector of the dropdown's text input.
    pub selector: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TableSettings {
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
    #[serde(default = "default_cell_selector")]
    pub cell_selector: String,
    /// Names for the leading cells of each row. Empty means "the level ids".
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default = "default_pagination_selector")]
    pub pagination_selector: String,
    #[serde(default = "default_next_xpath")]
    pub next_xpath: String,
    #[serde(default)]
    pub pages: PageSpan,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            row_selector: default_row_selector(),
            cell_selector: default_cell_selector(),
            columns: Vec::new(),
            pagination_selector: default_pagination_selector(),
            next_xpath: default_next_xpath(),
            pages: PageSpan::default(),
        }
    }
}

/// Which result pages a run reads for each chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSpan {
    #[default]
    FirstLast,
    All,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            stderr: true,
            json: false,
            filter: default_log_filter(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_indicators() -> Vec<String> {
    [".loading", ".spinner", ".mantine-LoadingOverlay-root"]
        .map(String::from)
        .to_vec()
}
fn default_gate_timeout_ms() -> u64 {
    15_000
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_option_selector() -> String {
    r#"[role="option"]"#.into()
}
fn default_open_timeout_ms() -> u64 {
    10_000
}
fn default_open_delay_ms() -> u64 {
    1_000
}
fn default_select_delay_ms() -> u64 {
    1_000
}
fn default_close_delay_ms() -> u64 {
    500
}
fn default_row_selector() -> String {
    "tbody tr".into()
}
fn default_cell_selector() -> String {
    "td".into()
}
fn default_pagination_selector() -> String {
    "button.mantine-Pagination-control".into()
}
fn default_next_xpath() -> String {
    "//button[normalize-space(.)='Next']".into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl CascadeConfig {
    /// Table column names, falling back to the level ids.
    pub fn table_columns(&self) -> Vec<String> {
        if self.table.columns.is_empty() {
            self.levels.iter().map(|l| l.id.clone()).collect()
        } else {
            self.table.columns.clone()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::Message(
                "at least one dropdown level must be configured".into(),
            ));
        }
        let mut seen = HashSet::new();
        for level in &self.levels {
            if !seen.insert(level.id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "duplicate level id '{}'",
                    level.id
                )));
            }
            if level.limit == Some(0) {
                return Err(ConfigError::Message(format!(
                    "level '{}' has limit 0; omit the limit to explore every option",
                    level.id
                )));
            }
        }
        if self.gate.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "gate.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct CascadeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for CascadeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeConfigLoader {
    /// Start with no file sources; `CASCADE__` env overrides are applied
    /// last, on [`load`](Self::load).
    ///
    /// ```
    /// use cascade_config::CascadeConfigLoader;
    ///
    /// let config = CascadeConfigLoader::new()
    ///     .with_yaml_str("levels:\n  - id: region\n    selector: '#region'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.levels[0].id, "region");
    /// assert_eq!(config.gate.timeout_ms, 15_000);
    /// assert!(config.webdriver.headless);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so a deployment can rely purely on
    /// environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use cascade_config::{CascadeConfigLoader, SetupStep};
    ///
    /// let cfg = CascadeConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// start_url: "https://example.test/"
    /// setup:
    ///   - action: click
    ///     selector: "button.login"
    ///   - action: wait_idle
    /// levels:
    ///   - id: region
    ///     selector: "input[placeholder='Filter by Region']"
    ///     limit: 2
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.setup.len(), 2);
    /// assert_eq!(cfg.setup[1], SetupStep::WaitIdle);
    /// assert_eq!(cfg.levels[0].limit, Some(2));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder, expand `${VAR}` placeholders and deserialize into
    /// strongly typed, validated config.
    pub fn load(self) -> Result<CascadeConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("CASCADE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: CascadeConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("CASCADE_TEST_USER", Some("qa-bot"), || {
            let mut v = json!("user=${CASCADE_TEST_USER}");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("user=qa-bot"));
        });
    }

    #[test]
    fn expands_inside_setup_steps() {
        temp_env::with_vars(
            [("LOGIN_EMAIL", Some("qa@example.test")), ("LOGIN_PASSWORD", Some("s3cret"))],
            || {
                let mut v = json!({
                    "setup": [
                        { "action": "fill", "selector": "#email", "value": "$LOGIN_EMAIL" },
                        { "action": "fill", "selector": "#password", "value": "${LOGIN_PASSWORD}" },
                        { "action": "pause", "ms": 500 }
                    ]
                });
                expand_env_in_value(&mut v);
                assert_eq!(v["setup"][0]["value"], json!("qa@example.test"));
                assert_eq!(v["setup"][1]["value"], json!("s3cret"));
                assert_eq!(v["setup"][2]["ms"], json!(500));
            },
        );
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("HOST", Some("staging.example.test")),
                ("BASE", Some("https://${HOST}")),
            ],
            || {
                let mut v = json!("${BASE}/retailers");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("https://staging.example.test/retailers"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${CASCADE_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${CASCADE_DOES_NOT_EXIST}"));
    }

    fn level(id: &str, limit: Option<usize>) -> LevelSpec {
        LevelSpec {
            id: id.into(),
            selector: format!("#{id}"),
            limit,
        }
    }

    fn config_with(levels: Vec<LevelSpec>) -> CascadeConfig {
        CascadeConfig {
            webdriver: WebDriverSettings::default(),
            start_url: None,
            setup: Vec::new(),
            gate: GateSettings::default(),
            dropdown: DropdownSettings::default(),
            levels,
            table: TableSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    #[test]
    fn rejects_duplicate_levels() {
        let cfg = config_with(vec![level("region", None), level("region", None)]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_limit() {
        let cfg = config_with(vec![level("region", Some(0))]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn page_span_defaults_to_first_and_last() {
        let table: TableSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(table.pages, PageSpan::FirstLast);
        let table: TableSettings = serde_json::from_value(json!({ "pages": "all" })).unwrap();
        assert_eq!(table.pages, PageSpan::All);
        assert!(serde_json::from_value::<TableSettings>(json!({ "pages": "some" })).is_err());
    }

    #[test]
    fn table_columns_default_to_level_ids() {
        let mut cfg = config_with(vec![level("region", None), level("area", Some(3))]);
        assert_eq!(cfg.table_columns(), vec!["region", "area"]);
        cfg.table.columns = vec!["name".into(), "region".into()];
        assert_eq!(cfg.table_columns(), vec!["name", "region"]);
    }
}
