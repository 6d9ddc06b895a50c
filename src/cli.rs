use crate::orchestrator;
use crate::text_summary::{self, ResponseKind};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use intelliscrape::config::{default_user_agent, ClientConfig, DEFAULT_BASE_URL};
use intelliscrape::model::{CrawlTaskCreate, DataSourceInput};
use intelliscrape::routes::{self, View};
use intelliscrape::{ApiClient, UiStatusStore};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "intelliscrape",
    version,
    about = "Client for the IntelliScrape theme and crawl-task service"
)]
pub struct Cli {
    /// Base URL of the IntelliScrape API
    #[arg(long, env = "INTELLISCRAPE_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// How long an error stays on the status line before it is cleared
    #[arg(long, default_value = "5s", global = true)]
    pub error_ttl: humantime::Duration,

    /// Print the raw JSON response instead of a text summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long, global = true)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Analyze, inspect and standardize themes
    #[command(subcommand)]
    Themes(ThemesCommand),

    /// Create and list crawl tasks
    #[command(subcommand)]
    Tasks(TasksCommand),

    /// Manage data sources
    #[command(subcommand)]
    DataSources(DataSourcesCommand),

    /// Load the data behind an application path, e.g. /workbench/books
    Open {
        /// Application path (/, /data-sources, /workbench/<theme>, /tasks)
        path: String,
    },

    /// Print the effective client configuration as JSON
    Config,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ThemesCommand {
    /// Start a background analysis of a data source for a theme
    Analyze {
        #[arg(long)]
        data_source: i64,
        #[arg(long)]
        theme: String,
    },

    /// Show fields discovered for a theme and the standardization recommendations
    Workbench { theme: String },

    /// Submit a standardization payload read from a JSON file
    Standardize {
        #[arg(long)]
        file: PathBuf,
    },

    /// Show the analysis status of every data source for a theme
    Status {
        theme: String,

        /// Keep polling until every analysis has completed or failed
        #[arg(long)]
        watch: bool,

        /// Polling interval for --watch
        #[arg(long, default_value = "2s")]
        interval: humantime::Duration,
    },

    /// List standard datasets
    List,
}

#[derive(Debug, Subcommand, Clone)]
pub enum TasksCommand {
    /// Create a crawl task; one-off tasks start immediately
    Create(TaskCreateArgs),

    /// List crawl tasks
    List,
}

#[derive(Debug, Args, Clone)]
pub struct TaskCreateArgs {
    /// Read the task definition from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["name", "dataset", "sources", "cron"])]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub name: Option<String>,

    /// Standard dataset the task fills
    #[arg(long)]
    pub dataset: Option<i64>,

    /// Data source to crawl (repeatable or comma-separated)
    #[arg(long = "source", value_delimiter = ',')]
    pub sources: Vec<i64>,

    /// Cron expression for recurring runs
    #[arg(long)]
    pub cron: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum DataSourcesCommand {
    /// List data sources
    List,

    /// Show one data source
    Get { id: i64 },

    /// Register a new data source
    Create(DataSourceArgs),

    /// Replace an existing data source
    Update {
        id: i64,
        #[command(flatten)]
        source: DataSourceArgs,
    },

    /// Delete a data source
    Delete { id: i64 },
}

#[derive(Debug, Args, Clone)]
pub struct DataSourceArgs {
    /// Unique key identifying the site
    #[arg(long)]
    pub site_key: String,

    #[arg(long)]
    pub name: String,

    /// Root URL of the site
    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub description: Option<String>,
}

impl From<&DataSourceArgs> for DataSourceInput {
    fn from(args: &DataSourceArgs) -> Self {
        DataSourceInput {
            site_key: args.site_key.clone(),
            name: args.name.clone(),
            url: args.url.clone(),
            description: args.description.clone(),
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    let cfg = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();

    let result = if matches!(args.command, Command::Config) {
        emit(&args, &out_tx, ResponseKind::Raw, &serde_json::to_value(&cfg)?)
    } else {
        run_with_client(&args, &cfg, &out_tx).await
    };

    drop(out_tx);
    let _ = out_handle.await;
    result
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: default_user_agent(),
        error_ttl: Duration::from(args.error_ttl),
    }
}

async fn run_with_client(
    args: &Cli,
    cfg: &ClientConfig,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let store = UiStatusStore::global();
    let client = ApiClient::new(cfg, store.clone()).context("failed to create API client")?;

    let status_line =
        (!args.silent).then(|| orchestrator::spawn_status_line(store.subscribe(), out.clone()));

    let result = execute(args, &client, out).await;

    if let Some(line) = status_line {
        line.finish().await;
    }
    result
}

async fn execute(
    args: &Cli,
    client: &ApiClient,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    match &args.command {
        Command::Themes(cmd) => match cmd {
            ThemesCommand::Analyze { data_source, theme } => {
                let resp = client
                    .trigger_analysis(*data_source, theme)
                    .await
                    .context("failed to trigger analysis")?;
                emit(args, out, ResponseKind::Message, &resp.body)
            }
            ThemesCommand::Workbench { theme } => {
                let resp = client
                    .get_workbench_data(theme)
                    .await
                    .with_context(|| format!("failed to load workbench for {theme}"))?;
                emit(args, out, ResponseKind::Workbench, &resp.body)
            }
            ThemesCommand::Standardize { file } => {
                let payload = read_json_file(file)?;
                let resp = client
                    .standardize_theme(&payload)
                    .await
                    .context("failed to standardize theme")?;
                emit(args, out, ResponseKind::Message, &resp.body)
            }
            ThemesCommand::Status {
                theme,
                watch,
                interval,
            } => {
                if *watch {
                    let progress = !args.silent && !args.json;
                    let statuses = orchestrator::watch_analysis(
                        client,
                        theme,
                        Duration::from(*interval),
                        |statuses| {
                            if progress {
                                let line = text_summary::progress_line(statuses);
                                let _ = out.send(OutputLine::Stderr(line));
                            }
                        },
                    )
                    .await?;
                    emit(
                        args,
                        out,
                        ResponseKind::AnalysisStatuses,
                        &serde_json::to_value(statuses)?,
                    )
                } else {
                    let resp = client
                        .get_analysis_status(theme)
                        .await
                        .with_context(|| format!("failed to fetch analysis status for {theme}"))?;
                    emit(args, out, ResponseKind::AnalysisStatuses, &resp.body)
                }
            }
            ThemesCommand::List => {
                let resp = client
                    .list_standard_datasets()
                    .await
                    .context("failed to list standard datasets")?;
                emit(args, out, ResponseKind::StandardDatasets, &resp.body)
            }
        },
        Command::Tasks(cmd) => match cmd {
            TasksCommand::Create(task) => {
                let payload = task_payload(task)?;
                let resp = client
                    .create_crawl_task(&payload)
                    .await
                    .context("failed to create crawl task")?;
                emit(args, out, ResponseKind::CrawlTask, &resp.body)
            }
            TasksCommand::List => {
                let resp = client
                    .list_crawl_tasks()
                    .await
                    .context("failed to list crawl tasks")?;
                emit(args, out, ResponseKind::CrawlTasks, &resp.body)
            }
        },
        Command::DataSources(cmd) => match cmd {
            DataSourcesCommand::List => {
                let resp = client
                    .list_data_sources()
                    .await
                    .context("failed to list data sources")?;
                emit(args, out, ResponseKind::DataSources, &resp.body)
            }
            DataSourcesCommand::Get { id } => {
                let resp = client
                    .get_data_source(*id)
                    .await
                    .with_context(|| format!("failed to fetch data source {id}"))?;
                emit(args, out, ResponseKind::DataSource, &resp.body)
            }
            DataSourcesCommand::Create(source) => {
                let resp = client
                    .create_data_source(&source.into())
                    .await
                    .context("failed to create data source")?;
                emit(args, out, ResponseKind::DataSource, &resp.body)
            }
            DataSourcesCommand::Update { id, source } => {
                let resp = client
                    .update_data_source(*id, &source.into())
                    .await
                    .with_context(|| format!("failed to update data source {id}"))?;
                emit(args, out, ResponseKind::DataSource, &resp.body)
            }
            DataSourcesCommand::Delete { id } => {
                let resp = client
                    .delete_data_source(*id)
                    .await
                    .with_context(|| format!("failed to delete data source {id}"))?;
                emit(args, out, ResponseKind::DataSource, &resp.body)
            }
        },
        Command::Open { path } => open_view(args, client, out, path).await,
        // Printed by `run` before a client is built.
        Command::Config => Ok(()),
    }
}

/// Resolve an application path and load the data its view shows.
async fn open_view(
    args: &Cli,
    client: &ApiClient,
    out: &mpsc::UnboundedSender<OutputLine>,
    path: &str,
) -> Result<()> {
    let route =
        routes::resolve(path).with_context(|| format!("no view is routed at {path:?}"))?;
    if !args.silent && !args.json {
        let _ = out.send(OutputLine::Stderr(format!("== {} ==", route.view)));
    }

    let (kind, resp) = match route.view {
        View::ThemeManagement => (
            ResponseKind::StandardDatasets,
            client.list_standard_datasets().await,
        ),
        View::DataSourceManagement => {
            (ResponseKind::DataSources, client.list_data_sources().await)
        }
        View::StandardizationWorkbench => {
            let theme = route
                .param("themeName")
                .context("workbench route is missing its theme name")?;
            (ResponseKind::Workbench, client.get_workbench_data(theme).await)
        }
        View::CrawlTaskManagement => (ResponseKind::CrawlTasks, client.list_crawl_tasks().await),
    };
    let resp = resp.with_context(|| format!("failed to load {}", route.view))?;
    emit(args, out, kind, &resp.body)
}

fn task_payload(task: &TaskCreateArgs) -> Result<Value> {
    if let Some(file) = task.file.as_deref() {
        return read_json_file(file);
    }
    let name = task
        .name
        .clone()
        .context("--name is required unless --file is given")?;
    let standard_dataset_id = task
        .dataset
        .context("--dataset is required unless --file is given")?;
    let body = CrawlTaskCreate {
        name,
        standard_dataset_id,
        data_source_ids: task.sources.clone(),
        schedule_cron: task.cron.clone(),
    };
    Ok(serde_json::to_value(body)?)
}

fn read_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Print a response body in the selected output mode.
fn emit(
    args: &Cli,
    out: &mpsc::UnboundedSender<OutputLine>,
    kind: ResponseKind,
    body: &Value,
) -> Result<()> {
    if args.silent {
        return Ok(());
    }
    if args.json {
        let _ = out.send(OutputLine::Stdout(serde_json::to_string_pretty(body)?));
        return Ok(());
    }
    let summary = text_summary::build_text_summary(kind, body)?;
    for line in summary.lines {
        let _ = out.send(OutputLine::Stdout(line));
    }
    Ok(())
}
