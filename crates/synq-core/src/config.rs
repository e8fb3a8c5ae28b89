use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::CommandKind;
use crate::connector::Origin;
use crate::retry::{KindTable, RetryBudget, RetryPolicy};

/// A retry budget as written in config.toml: a count or `"unlimited"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BudgetSetting {
    Count(u32),
    Word(String),
}

impl BudgetSetting {
    fn to_budget(&self) -> Result<RetryBudget> {
        match self {
            BudgetSetting::Count(n) => Ok(RetryBudget::Bounded(*n)),
            BudgetSetting::Word(w) if w.eq_ignore_ascii_case("unlimited") => {
                Ok(RetryBudget::Unlimited)
            }
            BudgetSetting::Word(w) => anyhow::bail!("invalid retry budget {:?}", w),
        }
    }
}

/// Retry backoff and per-kind budget overrides (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Per-kind retry budgets keyed by wire name, e.g. `"fetch-timeline" = 4`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub budgets: HashMap<String, BudgetSetting>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.5,
            max_delay_secs: 60,
            budgets: HashMap::new(),
        }
    }
}

impl RetryConfig {
    /// Negative or NaN base delays mean no delay; ones too large for a
    /// `Duration` saturate at the cap.
    pub fn policy(&self) -> RetryPolicy {
        let max_delay = Duration::from_secs(self.max_delay_secs);
        RetryPolicy {
            base_delay: Duration::try_from_secs_f64(self.base_delay_secs.max(0.0))
                .unwrap_or(max_delay),
            max_delay,
        }
    }

    /// Reject settings that only make sense by accident.
    pub fn validate(&self) -> Result<()> {
        if !self.base_delay_secs.is_finite() || self.base_delay_secs < 0.0 {
            anyhow::bail!(
                "retry.base_delay_secs must be a non-negative number of seconds, got {}",
                self.base_delay_secs
            );
        }
        self.budget_overrides()?;
        Ok(())
    }

    /// Parse the budget overrides. Unknown kind names are an error.
    pub fn budget_overrides(&self) -> Result<HashMap<CommandKind, RetryBudget>> {
        let mut out = HashMap::new();
        for (name, setting) in &self.budgets {
            let kind = CommandKind::from_wire(name);
            if kind == CommandKind::Unknown {
                anyhow::bail!("unknown command kind {:?} in [retry.budgets]", name);
            }
            let budget = setting
                .to_budget()
                .with_context(|| format!("retry budget for {}", name))?;
            out.insert(kind, budget);
        }
        Ok(out)
    }
}

/// One configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Unique account name, e.g. `alice@example.org`.
    pub name: String,
    pub origin: Origin,
}

/// Global configuration loaded from `~/.config/synq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynqConfig {
    /// Name of the persisted queue within the store.
    pub store_name: String,
    /// Maximum pending plus executing commands.
    pub max_queue_len: usize,
    /// Enqueue an automatic update this often while the worker runs (None = never).
    #[serde(default)]
    pub automatic_update_secs: Option<u64>,
    /// Override for the queue database path (default: XDG state dir).
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<AccountConfig>,
}

impl Default for SynqConfig {
    fn default() -> Self {
        Self {
            store_name: "command-queue".to_string(),
            max_queue_len: crate::queue::DEFAULT_CAPACITY,
            automatic_update_secs: None,
            database_path: None,
            retry: RetryConfig::default(),
            accounts: Vec::new(),
        }
    }
}

impl SynqConfig {
    /// Build the kind table: built-in policies plus configured budget overrides.
    pub fn kind_table(&self) -> Result<KindTable> {
        Ok(KindTable::with_budgets(&self.retry.budget_overrides()?))
    }

    pub fn automatic_update_interval(&self) -> Option<Duration> {
        self.automatic_update_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("synq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SynqConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] with an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<SynqConfig> {
    if !path.exists() {
        let default_cfg = SynqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: SynqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.retry
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}
