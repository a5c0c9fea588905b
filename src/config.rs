use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration, assembled from defaults, an optional YAML file,
/// and environment variables (env wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub data: DataConfig,
    pub retrieval: RetrievalConfig,
    pub workflow: WorkflowConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub provider: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            provider: "openai".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub vector_db_path: PathBuf,
    pub policy_data_path: PathBuf,
    pub template_data_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            vector_db_path: PathBuf::from("./vector_db"),
            policy_data_path: PathBuf::from("./data/policies"),
            template_data_path: PathBuf::from("./data/templates.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub vector_weight: f64,
    pub bm25_weight: f64,
    pub normalize_scores: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            bm25_weight: 0.3,
            normalize_scores: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_iterations: u32,
    pub min_compliance_score: f64,
    pub strict_compliance: bool,
    pub auto_refinement: bool,
    /// Run request analysis and initial policy retrieval concurrently.
    /// Off by default; serial ordering is the documented contract.
    pub overlap_analysis: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_compliance_score: 80.0,
            strict_compliance: true,
            auto_refinement: true,
            overlap_analysis: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_items: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            ttl_seconds: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            data: DataConfig::default(),
            retrieval: RetrievalConfig::default(),
            workflow: WorkflowConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply env overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Overlay environment variables on top of the loaded configuration.
    /// Malformed numeric values are ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        env_parse("LLM_TEMPERATURE", &mut self.llm.temperature);
        env_parse("LLM_MAX_TOKENS", &mut self.llm.max_tokens);
        env_parse("LLM_TIMEOUT_SECS", &mut self.llm.timeout_secs);

        if let Ok(v) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        env_parse("EMBEDDING_TIMEOUT_SECS", &mut self.embedding.timeout_secs);

        if let Ok(v) = std::env::var("VECTOR_DB_PATH") {
            self.data.vector_db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("POLICY_DATA_PATH") {
            self.data.policy_data_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TEMPLATE_DATA_PATH") {
            self.data.template_data_path = PathBuf::from(v);
        }

        env_parse("HYBRID_VECTOR_WEIGHT", &mut self.retrieval.vector_weight);
        env_parse("HYBRID_BM25_WEIGHT", &mut self.retrieval.bm25_weight);

        env_parse("MAX_ITERATIONS", &mut self.workflow.max_iterations);
        env_parse("MIN_COMPLIANCE_SCORE", &mut self.workflow.min_compliance_score);
        env_parse("STRICT_COMPLIANCE", &mut self.workflow.strict_compliance);

        env_parse("CACHE_MAX_ITEMS", &mut self.cache.max_items);
        env_parse("CACHE_TTL_SECONDS", &mut self.cache.ttl_seconds);
    }
}

/// Parse an env var into `target`, leaving it untouched on absence or parse failure.
fn env_parse<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<T>() {
            Ok(v) => *target = v,
            Err(_) => log::warn!("Ignoring malformed {}: {:?}", name, raw),
        }
    }
}
