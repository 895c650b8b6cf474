use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extensions considered source files during discovery. Empty means
    /// every regular file is taken.
    pub file_extensions: Vec<String>,
    pub max_file_size: usize,
    /// Upper bound on concurrently running file pipelines, which also
    /// bounds in-flight LLM calls per batch.
    pub max_workers: usize,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Additional attempts after a failed gateway call. The default of 0
    /// means no retries; raise it per deployment to ride out rate limits.
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Copyleft files with at most this many functions get translated
    /// instead of structurally extracted.
    pub translation_threshold: usize,
    pub target_language: String,
    pub target_extension: String,
    /// Run the prompt-injection safety check before any analysis call.
    pub safety_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_extensions: vec![
                "py".to_string(),
                "js".to_string(),
                "ts".to_string(),
                "java".to_string(),
                "rs".to_string(),
                "go".to_string(),
                "c".to_string(),
                "cpp".to_string(),
                "h".to_string(),
            ],
            max_file_size: 1024 * 1024, // 1MB
            max_workers: 2,
            llm: LlmConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: None,
            base_url: None,
            model: "gpt-4".to_string(),
            max_tokens: 4000,
            temperature: 0.1,
            timeout_seconds: 300,
            retry_count: 0,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            translation_threshold: 2,
            target_language: "rust".to_string(),
            target_extension: "rs".to_string(),
            safety_check: false,
        }
    }
}

impl Config {
    /// Get the default config file path (~/.license-triage.toml)
    pub fn default_config_path() -> anyhow::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join(".license-triage.toml"))
    }

    /// Load config from file, falling back to defaults if the file doesn't
    /// exist, then fill the API key from the environment when the file left
    /// it unset.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::default_config_path()?;

        let mut config = if config_path.exists() {
            info!(path = %config_path.display(), "loading configuration file");
            Self::from_file(&config_path)?
        } else {
            info!(path = %config_path.display(), "no config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = match self.llm.provider {
                LlmProvider::OpenAi => env::var("OPENAI_API_KEY").ok(),
                LlmProvider::Anthropic => env::var("ANTHROPIC_API_KEY").ok(),
            };
        }
    }

    /// Create a config file with all available options documented.
    pub fn create_documented_config() -> String {
        r#"# license-triage configuration file

# File extensions to pick up during input discovery
file_extensions = ["py", "js", "ts", "java", "rs", "go", "c", "cpp", "h"]

# Maximum file size to analyze (in bytes, default 1MB)
max_file_size = 1048576

# Maximum number of file pipelines running concurrently.
# Keep this small to respect provider rate limits.
max_workers = 2

[llm]
# LLM provider: "OpenAi" or "Anthropic"
provider = "OpenAi"

# API key for the provider (can also be set via environment variables)
# OpenAi: OPENAI_API_KEY
# Anthropic: ANTHROPIC_API_KEY
# api_key = "your-api-key-here"

# Base URL override (proxies, self-hosted compatible endpoints)
# base_url = "https://api.openai.com"

# Model to use
model = "gpt-4"

# Maximum tokens for LLM responses
max_tokens = 4000

# Temperature for LLM responses (0.0 = deterministic, 1.0 = creative)
temperature = 0.1

# Request timeout in seconds
timeout_seconds = 300

# Additional attempts after a failed gateway call
retry_count = 0

[analysis]
# Copyleft files with at most this many functions are rewritten into the
# target language; larger files get structural signature extraction instead.
translation_threshold = 2

# Translation target
target_language = "rust"
target_extension = "rs"

# Check content for prompt injection before analyzing it
safety_check = false
"#
        .to_string()
    }
}
