use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use alimgen::config::Config;
use alimgen::domain::{ApprovedTemplate, BusinessType, PolicyChunk, PolicyType, TemplateRequest};
use alimgen::llm::{AnthropicClient, AnthropicConfig};
use alimgen::search::{HttpEmbeddingClient, InMemoryVectorStore};
use alimgen::service::TemplateService;

#[derive(Parser)]
#[command(name = "alimgen", about = "Policy-compliant AlimTalk template generation", version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a template from a natural-language request
    Generate {
        /// The request text, in Korean
        request: String,
    },
    /// Validate existing template text against the policy rules
    Validate {
        /// Template text to check
        text: String,
        /// Optional button label
        #[arg(short, long)]
        button: Option<String>,
    },
    /// List template categories and taxonomies
    Categories,
    /// Show approved template examples for a business type
    Examples {
        /// Business type (e.g. education, medical, ecommerce)
        business_type: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

fn setup_logging(config: &Config) {
    let level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Load policy chunks from the configured path. The real ingestion pipeline
/// (markdown splitting, typing) is an external loader; this reads its JSON
/// output, falling back to a single baseline chunk so the index can build.
fn load_chunks(config: &Config) -> Vec<PolicyChunk> {
    let path = config.data.policy_data_path.join("chunks.json");
    if let Ok(raw) = fs::read_to_string(&path) {
        match serde_json::from_str::<Vec<PolicyChunk>>(&raw) {
            Ok(chunks) => {
                info!("loaded {} policy chunks from {}", chunks.len(), path.display());
                return chunks;
            }
            Err(e) => log::warn!("ignoring malformed {}: {}", path.display(), e),
        }
    }

    log::warn!("no policy corpus at {}; using baseline rules only", path.display());
    vec![PolicyChunk {
        content: "알림톡은 정보성 메시지만 발송 가능합니다. 메시지는 1,000자 이내로 작성하고 \
                  변수는 #{변수명} 형태로 사용하며 40개를 초과할 수 없습니다. 광고성 표현은 금지됩니다."
            .to_string(),
        source: "baseline".to_string(),
        policy_type: PolicyType::General,
        chunk_index: 0,
        relevance_score: 0.0,
    }]
}

fn load_templates(config: &Config) -> Vec<ApprovedTemplate> {
    match fs::read_to_string(&config.data.template_data_path) {
        Ok(raw) => match serde_json::from_str::<Vec<ApprovedTemplate>>(&raw) {
            Ok(templates) => {
                info!("loaded {} approved templates", templates.len());
                templates
            }
            Err(e) => {
                log::warn!("ignoring malformed template data: {}", e);
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}

async fn build_service(config: &Config) -> Result<TemplateService> {
    let chat = Arc::new(
        AnthropicClient::new(AnthropicConfig::from(&config.llm))
            .context("LLM client initialization failed")?,
    );

    let embedding_key = std::env::var("EMBEDDING_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .unwrap_or_default();
    let embedder = Arc::new(HttpEmbeddingClient::new(
        config.embedding.model.clone(),
        embedding_key,
        std::time::Duration::from_secs(config.embedding.timeout_secs),
    ));

    let chunks = load_chunks(config);
    let templates = load_templates(config);

    TemplateService::new(
        config,
        chat,
        embedder,
        Arc::new(InMemoryVectorStore::new()),
        chunks,
        templates,
    )
    .await
    .context("service initialization failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;
    setup_logging(&config);

    match cli.command {
        Command::Generate { request } => {
            let service = build_service(&config).await?;
            let result = service.generate(&TemplateRequest::new(request)).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Validate { text, button } => {
            let service = build_service(&config).await?;
            let report = service.validate_template(&text, None, None, button).await;
            println!("{}", report.report);
        }
        Command::Categories => {
            // No upstream calls needed; still build the service for one
            // consistent wiring path
            let service = build_service(&config).await?;
            println!("{}", serde_json::to_string_pretty(&service.list_categories())?);
        }
        Command::Examples { business_type, limit } => {
            let service = build_service(&config).await?;
            let business_type = BusinessType::parse_or_default(&business_type);
            let examples = service.search_examples(business_type, limit);
            println!("{}", serde_json::to_string_pretty(&examples)?);
        }
    }

    Ok(())
}
