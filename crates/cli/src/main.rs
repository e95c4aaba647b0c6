//! `story-transformer`: retell a story in a new world and a chosen style.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Select;
use llm::{CompletionBackend, GroqBackend};
use pipeline::{
    ConfigurationError, Credential, FileSink, OutputSink, PipelineConfig, PipelineResult,
    TransformationRequest, Transformer,
};
use std::path::PathBuf;
use story::Style;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CHOOSE: &str = "choose";

#[derive(Parser, Debug)]
#[command(name = "story-transformer")]
#[command(about = "Transform a classic story into a new world and style")]
#[command(version)]
struct Args {
    /// Story file path, a built-in story name, or the story text itself
    #[arg(long, default_value = "Cinderella")]
    source: String,

    /// World to move the story into
    #[arg(long, default_value = "Indian Education System")]
    target: String,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// narrative, screenplay, satirical, epic, or "choose" to pick interactively
    #[arg(long, default_value = CHOOSE)]
    style: String,

    /// Overrides GROQ_API_KEY
    #[arg(long)]
    api_key: Option<String>,

    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    model: Option<String>,

    /// Minimum length of the generated story
    #[arg(long)]
    min_words: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig, ConfigurationError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model.model = model.clone();
    }
    if let Some(min_words) = args.min_words {
        config.validation.min_words = min_words;
    }
    config.check()?;
    Ok(config)
}

fn choose_style() -> Result<Style> {
    let items: Vec<String> = Style::ALL
        .iter()
        .map(|style| format!("{} - {}", style.label(), style.description()))
        .collect();
    let selection = Select::new()
        .with_prompt("Choose a writing style")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to read style selection")?;
    Ok(Style::ALL[selection])
}

fn resolve_style(arg: &str) -> Result<Style> {
    if arg.trim().eq_ignore_ascii_case(CHOOSE) {
        return choose_style();
    }
    Ok(arg.parse::<Style>()?)
}

/// Validate the request, then run the pipeline. Nothing reaches the backend
/// unless the style and inputs are accepted.
async fn transform<B: CompletionBackend>(
    backend: B,
    config: &PipelineConfig,
    source_text: String,
    target: &str,
    style: &str,
) -> Result<PipelineResult> {
    let style = resolve_style(style)?;
    let request = TransformationRequest::new(source_text, target, style)?;
    info!(style = %style, target = request.target_context(), "Transforming story");

    let transformer = Transformer::from_config(backend, config);
    Ok(transformer.run(&request).await?)
}

async fn run(args: Args) -> Result<()> {
    let credential = Credential::resolve(args.api_key.as_deref())?;
    let config = load_config(&args)?;

    let source = ingest::load_source(&args.source)
        .await
        .with_context(|| format!("Failed to load source '{}'", args.source))?;
    info!(origin = ?source.origin, chars = source.text.len(), "Source loaded");

    let backend = GroqBackend::new(
        credential.expose(),
        config.model.base_url.as_str(),
        config.model.model.as_str(),
    )
    .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?
    .with_temperature(config.model.temperature);
    info!(model = backend.model(), "Model backend ready");

    let result = transform(backend, &config, source.text, &args.target, &args.style).await?;

    let sink = FileSink::new(args.output_dir.clone());
    let stored = sink.store(&result).await?;

    println!("\n{}", result.map.new_title);
    println!("  {} words, {} model calls", result.word_count, result.total_model_calls());
    println!("  Story: {}", stored.story_path.display());
    println!("  Log:   {}", stored.log_path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::CINDERELLA;
    use llm::ScriptedBackend;
    use pipeline::StageFailure;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["story-transformer"]).unwrap();
        assert_eq!(args.source, "Cinderella");
        assert_eq!(args.target, "Indian Education System");
        assert_eq!(args.style, CHOOSE);
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert!(!args.log_json);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = Args::try_parse_from([
            "story-transformer",
            "--model",
            "llama-3.1-8b-instant",
            "--min-words",
            "600",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.model.model, "llama-3.1-8b-instant");
        assert_eq!(config.validation.min_words, 600);
    }

    #[tokio::test]
    async fn test_unknown_style_never_reaches_backend() {
        let backend = ScriptedBackend::new().with_reply("{}");
        let config = PipelineConfig::default();

        let err = transform(backend.clone(), &config, CINDERELLA.to_string(), "Cyberpunk Tokyo", "Haiku")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Haiku"));
        assert_eq!(backend.call_count(), 0);
        assert_eq!(backend.remaining(), 1);
    }

    #[tokio::test]
    async fn test_known_style_reaches_backend() {
        let backend = ScriptedBackend::new();
        let mut config = PipelineConfig::default();
        config.retry.max_retries = 0;

        let err = transform(backend.clone(), &config, CINDERELLA.to_string(), "Cyberpunk Tokyo", "epic")
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<StageFailure>().is_some());
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_named_style_skips_prompt() {
        assert_eq!(resolve_style("Epic").unwrap(), Style::Epic);
        assert!(resolve_style("Haiku").is_err());
    }
}
