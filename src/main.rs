use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use sluice_core::domain::cache::memory::InMemoryInstanceCache;
use sluice_core::{DeployFlowParam, InstanceCache, ProcessEngine, Repositories};
use sluice_dsl::ModelFormat;
use sluice_monitoring::LogExt;

mod script;
mod settings;

use settings::AppConfig;
use script::{ScriptSession, Step};

/// Sluice - a process engine for user-task driven flows
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a flow model
    Validate {
        /// Path to the model document
        model: PathBuf,

        /// Document format; guessed from the extension when omitted
        #[arg(long, value_enum)]
        format: Option<Format>,
    },

    /// Deploy a model into a fresh engine and run a script of operations
    Run {
        /// Path to the model document
        model: PathBuf,

        /// Document format; guessed from the extension when omitted
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Path to the script (JSON or YAML list of steps)
        #[arg(long)]
        script: PathBuf,

        /// Module id to deploy under
        #[arg(long, default_value = "default")]
        module: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

impl From<Format> for ModelFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ModelFormat::Json,
            Format::Yaml => ModelFormat::Yaml,
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn model_format(path: &Path, explicit: Option<Format>) -> ModelFormat {
    match explicit {
        Some(format) => format.into(),
        None if is_yaml(path) => ModelFormat::Yaml,
        None => ModelFormat::Json,
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(feature = "redis")]
async fn redis_cache(cache_url: &str) -> Result<Arc<dyn InstanceCache>> {
    let cache = sluice_core::domain::cache::redis::RedisInstanceCache::connect(cache_url)
        .await
        .context("failed to connect to redis")?;
    Ok(Arc::new(cache))
}

#[cfg(not(feature = "redis"))]
async fn redis_cache(cache_url: &str) -> Result<Arc<dyn InstanceCache>> {
    bail!("cache url {} needs the redis feature", cache_url)
}

async fn build_cache(cache_url: &str) -> Result<Arc<dyn InstanceCache>> {
    if cache_url.starts_with("memory://") {
        Ok(Arc::new(InMemoryInstanceCache::new()))
    } else if cache_url.starts_with("redis://") || cache_url.starts_with("rediss://") {
        redis_cache(cache_url).await
    } else {
        bail!("unsupported cache url {}", cache_url)
    }
}

async fn validate(model: &Path, format: Option<Format>) -> Result<()> {
    let text = read_file(model).await?;
    let flow_model = sluice_dsl::parse_and_validate(&text, model_format(model, format))
        .with_context(|| format!("{} is not a valid flow model", model.display()))?;

    let summary = serde_json::json!({
        "model": model.display().to_string(),
        "valid": true,
        "elements": flow_model.len(),
        "startEvent": flow_model.start_event()?.key.clone(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run(
    app_config: AppConfig,
    model: &Path,
    format: Option<Format>,
    script_path: &Path,
    module: String,
) -> Result<()> {
    let text = read_file(model).await?;
    let script_text = read_file(script_path).await?;
    let steps: Vec<Step> = if is_yaml(script_path) {
        serde_yaml::from_str(&script_text)
            .with_context(|| format!("failed to parse script {}", script_path.display()))?
    } else {
        serde_json::from_str(&script_text)
            .with_context(|| format!("failed to parse script {}", script_path.display()))?
    };

    let cache = build_cache(&app_config.cache_url).await?;
    let engine = ProcessEngine::new(Repositories::in_memory(), cache, app_config.runtime);

    let deployed = engine
        .deploy(DeployFlowParam {
            flow_module_id: module,
            flow_model: text,
            format: model_format(model, format),
            tenant_id: None,
            operator: None,
        })
        .await;
    let Some(flow_deploy_id) = deployed.flow_deploy_id else {
        bail!("deploy failed ({}): {}", deployed.common.err_code, deployed.common.err_msg);
    };
    info!(flow_deploy_id = %flow_deploy_id, steps = steps.len(), "Running script");

    let outputs = ScriptSession::new(&engine, flow_deploy_id).run(steps).await?;
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load(cli.config.as_deref())?;
    sluice_monitoring::init_logging(&app_config.monitoring)
        .context("Failed to initialize logging")?;

    let outcome = match cli.command {
        Commands::Validate { model, format } => validate(&model, format).await,
        Commands::Run {
            model,
            format,
            script,
            module,
        } => run(app_config, &model, format, &script, module).await,
    };
    outcome.log_err("sluice command failed")
}
