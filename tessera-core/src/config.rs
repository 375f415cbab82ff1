use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TesseraConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings that shape derivation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Domain appended to synthesized `Host:` rules.
    #[serde(default)]
    pub domain: String,
    /// Expose instances that carry no `traefik.enable` label.
    #[serde(default = "default_true")]
    pub exposed_by_default: bool,
}

/// Where and how the derived configuration is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Output file. `None` = stdout.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_true() -> bool { true }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            exposed_by_default: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            path: None,
        }
    }
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => anyhow::bail!("unknown output format: {other}"),
        }
    }
}

impl TesseraConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Environment keys use a `TESSERA_` prefix and `__` between levels,
    /// e.g. `TESSERA_PROVIDER__DOMAIN`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: TesseraConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TESSERA_").split("__"))
            .extract()?;
        Ok(config)
    }
}
