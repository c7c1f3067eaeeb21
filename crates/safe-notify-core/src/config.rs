use crate::error::{NotifyError, Result};
use crate::types::{Category, Environment};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Health checks more frequent than this would mostly generate noise.
pub const MIN_HEALTH_CHECK_INTERVAL_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ChannelMap
// ---------------------------------------------------------------------------

/// Destination channel per category. Budget alerts have no entry of their
/// own; they are always delivered to the health channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Fallback for categories without a channel of their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            planning: Some("#pi-planning".to_string()),
            sync: Some("#linear-sync".to_string()),
            health: Some("#system-health".to_string()),
            workflow: Some("#workflow".to_string()),
            agent: Some("#agents".to_string()),
            errors: Some("#notification-errors".to_string()),
        }
    }
}

impl ChannelMap {
    /// A map with no entries at all; everything goes to the webhook default.
    pub fn empty() -> Self {
        Self {
            planning: None,
            sync: None,
            health: None,
            workflow: None,
            agent: None,
            errors: None,
        }
    }

    /// The explicit entry for `category`, if the map has a slot for it.
    pub fn get(&self, category: Category) -> Option<&str> {
        let entry = match category {
            Category::Planning => &self.planning,
            Category::Sync => &self.sync,
            Category::Health => &self.health,
            Category::Workflow => &self.workflow,
            Category::Agent => &self.agent,
            Category::Budget => return None,
        };
        entry.as_deref()
    }

    fn entries(&self) -> [(&'static str, &Option<String>); 6] {
        [
            ("planning", &self.planning),
            ("sync", &self.sync),
            ("health", &self.health),
            ("workflow", &self.workflow),
            ("agent", &self.agent),
            ("errors", &self.errors),
        ]
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Warning thresholds used by the health monitor, not by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub token_expiry_warning_days: u32,
    pub token_expiry_critical_days: u32,
    pub api_usage_warning_percent: f64,
    pub api_usage_critical_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            token_expiry_warning_days: 7,
            token_expiry_critical_days: 1,
            api_usage_warning_percent: 80.0,
            api_usage_critical_percent: 95.0,
        }
    }
}

// ---------------------------------------------------------------------------
// EnabledCategories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledCategories {
    pub planning: bool,
    pub sync: bool,
    pub health: bool,
    pub budget: bool,
    pub workflow: bool,
    pub agent: bool,
}

impl Default for EnabledCategories {
    fn default() -> Self {
        Self {
            planning: true,
            sync: true,
            health: true,
            budget: true,
            workflow: true,
            agent: true,
        }
    }
}

impl EnabledCategories {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Planning => self.planning,
            Category::Sync => self.sync,
            Category::Health => self.health,
            Category::Budget => self.budget,
            Category::Workflow => self.workflow,
            Category::Agent => self.agent,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        let slot = match category {
            Category::Planning => &mut self.planning,
            Category::Sync => &mut self.sync,
            Category::Health => &mut self.health,
            Category::Budget => &mut self.budget,
            Category::Workflow => &mut self.workflow,
            Category::Agent => &mut self.agent,
        };
        *slot = enabled;
    }
}

// ---------------------------------------------------------------------------
// ThrottlingPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottlingPolicy {
    pub window_ms: u64,
    pub max_per_window: u32,
    /// Critical health alerts skip the throttle gate entirely.
    pub critical_bypass: bool,
    /// Upper bound on tracked throttle keys.
    pub max_entries: usize,
}

impl Default for ThrottlingPolicy {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_per_window: 5,
            critical_bypass: true,
            max_entries: 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub channels: ChannelMap,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub enabled: EnabledCategories,
    #[serde(default)]
    pub throttling: ThrottlingPolicy,
}

impl NotificationConfig {
    /// Merge `patch` into this config. Keys absent from the patch keep their
    /// current value.
    pub fn apply(&mut self, patch: &NotificationConfigPatch) {
        if let Some(p) = &patch.channels {
            let c = &mut self.channels;
            merge(&mut c.planning, &p.planning);
            merge(&mut c.sync, &p.sync);
            merge(&mut c.health, &p.health);
            merge(&mut c.workflow, &p.workflow);
            merge(&mut c.agent, &p.agent);
            merge(&mut c.errors, &p.errors);
        }
        if let Some(p) = &patch.thresholds {
            let t = &mut self.thresholds;
            set(&mut t.token_expiry_warning_days, p.token_expiry_warning_days);
            set(&mut t.token_expiry_critical_days, p.token_expiry_critical_days);
            set(&mut t.api_usage_warning_percent, p.api_usage_warning_percent);
            set(&mut t.api_usage_critical_percent, p.api_usage_critical_percent);
        }
        if let Some(p) = &patch.enabled {
            let e = &mut self.enabled;
            set(&mut e.planning, p.planning);
            set(&mut e.sync, p.sync);
            set(&mut e.health, p.health);
            set(&mut e.budget, p.budget);
            set(&mut e.workflow, p.workflow);
            set(&mut e.agent, p.agent);
        }
        if let Some(p) = &patch.throttling {
            let t = &mut self.throttling;
            set(&mut t.window_ms, p.window_ms);
            set(&mut t.max_per_window, p.max_per_window);
            set(&mut t.critical_bypass, p.critical_bypass);
            set(&mut t.max_entries, p.max_entries);
        }
    }

    /// Findings that concern the dispatcher alone. Runtime updates are
    /// rejected when any of them is an error.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: &str| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: message.to_string(),
            })
        };

        if self.throttling.window_ms == 0 {
            error("throttling.window_ms must be greater than zero");
        }
        if self.throttling.max_per_window == 0 {
            error("throttling.max_per_window must be at least 1");
        }
        if self.throttling.max_entries == 0 {
            error("throttling.max_entries must be at least 1");
        }

        let thresholds = &self.thresholds;
        if thresholds.token_expiry_critical_days > thresholds.token_expiry_warning_days {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "thresholds.token_expiry_critical_days={} exceeds token_expiry_warning_days={}",
                    thresholds.token_expiry_critical_days, thresholds.token_expiry_warning_days
                ),
            });
        }

        for (name, channel) in self.channels.entries() {
            let Some(channel) = channel else { continue };
            let trimmed = channel.trim();
            if trimmed.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("channels.{name} is blank and will be treated as unmapped"),
                });
            } else if !(trimmed.starts_with('#') || trimmed.starts_with('@')) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "channels.{name}='{trimmed}' does not start with '#' or '@'"
                    ),
                });
            }
        }

        warnings
    }
}

/// Error-level messages joined with `; `, or `None` when there are none.
pub(crate) fn error_summary(warnings: &[ConfigWarning]) -> Option<String> {
    let errors: Vec<&str> = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .map(|w| w.message.as_str())
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

fn merge(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

fn set<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMapPatch {
    pub planning: Option<String>,
    pub sync: Option<String>,
    pub health: Option<String>,
    pub workflow: Option<String>,
    pub agent: Option<String>,
    pub errors: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsPatch {
    pub token_expiry_warning_days: Option<u32>,
    pub token_expiry_critical_days: Option<u32>,
    pub api_usage_warning_percent: Option<f64>,
    pub api_usage_critical_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledCategoriesPatch {
    pub planning: Option<bool>,
    pub sync: Option<bool>,
    pub health: Option<bool>,
    pub budget: Option<bool>,
    pub workflow: Option<bool>,
    pub agent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottlingPolicyPatch {
    pub window_ms: Option<u64>,
    pub max_per_window: Option<u32>,
    pub critical_bypass: Option<bool>,
    pub max_entries: Option<usize>,
}

/// A partial [`NotificationConfig`]; every leaf is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfigPatch {
    pub channels: Option<ChannelMapPatch>,
    pub thresholds: Option<ThresholdsPatch>,
    pub enabled: Option<EnabledCategoriesPatch>,
    pub throttling: Option<ThrottlingPolicyPatch>,
}

// ---------------------------------------------------------------------------
// CoordinatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthMonitoringConfig {
    pub enabled: bool,
    pub check_interval_ms: u64,
}

impl Default for HealthMonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: 5 * 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub health_monitoring: HealthMonitoringConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        create_default_config(Environment::Development)
    }
}

impl CoordinatorConfig {
    /// Read a YAML file and lay it over the defaults for its environment.
    ///
    /// The file's `environment` key picks the defaults (aliases such as
    /// `prod` are accepted); without one, `fallback` does. Keys absent from
    /// the file keep their default values.
    pub fn load(path: &Path, fallback: Environment) -> Result<Self> {
        if !path.exists() {
            return Err(NotifyError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let overlay: Value = serde_yaml::from_str(&data)?;

        let environment = match overlay.get("environment").and_then(Value::as_str) {
            Some(raw) => raw.parse::<Environment>()?,
            None => fallback,
        };
        let mut merged = serde_yaml::to_value(create_default_config(environment))?;
        if !overlay.is_null() {
            merge_yaml(&mut merged, overlay);
        }
        if let Value::Mapping(map) = &mut merged {
            map.insert("environment".into(), environment.as_str().into());
        }
        Ok(serde_yaml::from_value(merged)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.health_monitoring.enabled
            && self.health_monitoring.check_interval_ms < MIN_HEALTH_CHECK_INTERVAL_MS
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "health_monitoring.check_interval_ms={} is below the {}ms minimum",
                    self.health_monitoring.check_interval_ms, MIN_HEALTH_CHECK_INTERVAL_MS
                ),
            });
        }

        warnings.extend(self.notifications.validate());

        if self.health_monitoring.enabled
            && !self.notifications.enabled.health
            && !self.notifications.enabled.budget
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "health monitoring is enabled but health and budget notifications are disabled"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Factory and validation entry points
// ---------------------------------------------------------------------------

/// Environment-tuned defaults: production throttles hardest and checks
/// health most often.
pub fn create_default_config(environment: Environment) -> CoordinatorConfig {
    let (check_interval_ms, window_ms, max_per_window) = match environment {
        Environment::Development => (5 * 60_000, 60_000, 10),
        Environment::Staging => (5 * 60_000, 60_000, 5),
        Environment::Production => (2 * 60_000, 30_000, 3),
    };

    CoordinatorConfig {
        environment,
        notifications: NotificationConfig {
            throttling: ThrottlingPolicy {
                window_ms,
                max_per_window,
                ..ThrottlingPolicy::default()
            },
            ..NotificationConfig::default()
        },
        health_monitoring: HealthMonitoringConfig {
            enabled: true,
            check_interval_ms,
        },
    }
}

/// `true` when `config` has no error-level findings. Each finding is logged.
pub fn validate_config(config: &CoordinatorConfig) -> bool {
    let mut valid = true;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => {
                valid = false;
                tracing::error!(environment = %config.environment, "{}", w.message);
            }
            WarnLevel::Warning => {
                tracing::warn!(environment = %config.environment, "{}", w.message);
            }
        }
    }
    valid
}

/// Mappings merge key by key; any other value replaces what was there.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
