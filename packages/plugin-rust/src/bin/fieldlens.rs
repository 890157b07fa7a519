//! fieldlens: offline and REST-backed tooling for the search and usage engines.
//!
//! Schemas come either from the host REST API (`--base-url`) or from JSON
//! files holding the host's response bodies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fieldlens_core::settings::keys;
use fieldlens_core::{FieldCatalog, FormFields, JoinMode, Layout, RawConfig, UsageBundle};
use fieldlens_plugin::config_page::ConfigPage;
use fieldlens_plugin::provider::{AppSchema, RestSchemaProvider, StaticSchemaProvider};
use fieldlens_plugin::report_page::collect_report;
use fieldlens_plugin::search::{PageActivation, SearchSurface};
use fieldlens_plugin::store::MemoryConfigStore;
use fieldlens_plugin::{ConfigStore, SchemaProvider};
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Plugin id used for the in-memory store of a single CLI run.
const CLI_PLUGIN_ID: &str = "fieldlens-cli";

/// fieldlens command-line interface
#[derive(Parser, Debug)]
#[command(name = "fieldlens")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the search query for free text using a saved configuration
    Query(QueryArgs),
    /// Validate a field selection and print the configuration document to save
    Snapshot(SnapshotArgs),
    /// Print the field usage report as JSON
    Usage(UsageArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Application id
    #[arg(long, default_value = "1")]
    app: String,

    /// Host base URL; schemas are fetched over REST when set
    #[arg(long, env = "FIELDLENS_BASE_URL")]
    base_url: Option<String>,

    /// API token sent with REST requests
    #[arg(long, env = "FIELDLENS_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Form fields response body (JSON)
    #[arg(long)]
    fields: Option<PathBuf>,

    /// Form layout response body (JSON)
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Usage surfaces bundle (JSON)
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Fields of a related app, as APP=PATH; repeatable
    #[arg(long = "related", value_parser = parse_related)]
    related: Vec<(String, PathBuf)>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Saved configuration document (JSON object of strings)
    #[arg(long)]
    config: PathBuf,

    /// Override the saved token limit
    #[arg(long, visible_alias = "limit")]
    max_tokens: Option<i64>,

    /// Override the saved join mode (and, or)
    #[arg(long, value_parser = parse_join)]
    join: Option<JoinMode>,

    /// Search text
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Field codes to search, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    select: Vec<String>,

    /// Token limit (1-10)
    #[arg(long, default_value_t = 5)]
    max_tokens: i64,

    /// Join mode (and, or)
    #[arg(long, value_parser = parse_join, default_value = "and")]
    join: JoinMode,
}

#[derive(Args, Debug)]
struct UsageArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Configuration document holding notes (JSON object of strings)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Query(args) => run_query(args).await,
        Commands::Snapshot(args) => run_snapshot(args).await,
        Commands::Usage(args) => run_usage(args).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_query(args: QueryArgs) -> Result<()> {
    let mut document: RawConfig = read_json(&args.config)?;
    if let Some(limit) = args.max_tokens {
        document.insert(keys::MAX_TOKENS.to_string(), limit.to_string());
    }
    if let Some(join) = args.join {
        document.insert(keys::JOIN_MODE.to_string(), join.keyword().to_string());
    }

    let provider = args.source.provider()?;
    let store = MemoryConfigStore::with_document(CLI_PLUGIN_ID, document);
    let activation = PageActivation::new(args.source.app.clone());

    let surface = SearchSurface::activate(&activation, provider.as_ref(), &store, CLI_PLUGIN_ID)
        .await
        .context("activation torn down")?;

    if let Some(warning) = surface.drift_warning() {
        eprintln!("warning: {}", warning.message);
        for field in &warning.fields {
            eprintln!(
                "  {} ({}): {}",
                field.code,
                field.label.as_deref().unwrap_or("?"),
                serde_json::to_string(&field.reason)?
            );
        }
    }

    let plan = surface.plan_for(&args.text.join(" "));
    if !plan.dropped_tokens.is_empty() {
        eprintln!("dropped tokens: {}", plan.dropped_tokens.join(", "));
    }
    println!("{plan}");
    Ok(())
}

async fn run_snapshot(args: SnapshotArgs) -> Result<()> {
    let provider = args.source.provider()?;
    let form = provider
        .form_fields(&args.source.app)
        .await
        .context("cannot read form fields")?;

    let store = MemoryConfigStore::new();
    let mut page =
        ConfigPage::from_parts(CLI_PLUGIN_ID, FieldCatalog::from(&form), RawConfig::new());
    let mut draft = page.draft();
    draft.selected = args.select;
    draft.max_tokens = args.max_tokens;
    draft.join_mode = args.join;

    page.save(&store, &draft).await?;

    let document: BTreeMap<String, String> =
        store.load(CLI_PLUGIN_ID).await?.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn run_usage(args: UsageArgs) -> Result<()> {
    let notes = match &args.config {
        Some(path) => {
            let document: RawConfig = read_json(path)?;
            fieldlens_core::ReportConfig::from_raw(&document).notes
        }
        None => BTreeMap::new(),
    };

    let provider = args.source.provider()?;
    let rows = collect_report(provider.as_ref(), &args.source.app, &notes).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

impl SourceArgs {
    fn provider(&self) -> Result<Arc<dyn SchemaProvider>> {
        if let Some(base_url) = &self.base_url {
            return Ok(Arc::new(RestSchemaProvider::new(
                base_url.clone(),
                self.api_token.clone(),
            )));
        }

        let mut provider = StaticSchemaProvider::new();
        if let Some(fields) = &self.fields {
            let schema = AppSchema {
                fields: read_json::<FormFields>(fields)?,
                layout: read_optional::<Layout>(self.layout.as_deref())?,
                usage: read_optional::<UsageBundle>(self.bundle.as_deref())?,
            };
            provider = provider.with_app(&self.app, schema);
        }
        for (app, path) in &self.related {
            let schema = AppSchema {
                fields: read_json::<FormFields>(path)?,
                ..AppSchema::default()
            };
            provider = provider.with_app(app, schema);
        }
        Ok(Arc::new(provider))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("malformed JSON in {}", path.display()))
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), read_json)
}

fn parse_related(raw: &str) -> Result<(String, PathBuf), String> {
    let (app, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected APP=PATH, got {raw:?}"))?;
    if app.is_empty() || path.is_empty() {
        return Err(format!("expected APP=PATH, got {raw:?}"));
    }
    Ok((app.to_string(), PathBuf::from(path)))
}

fn parse_join(raw: &str) -> Result<JoinMode, String> {
    JoinMode::parse(raw).ok_or_else(|| format!("join mode must be `and` or `or`, got {raw:?}"))
}
