// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use cartsync::{
    config::{FolderEntry, ProjectConfig, ServerSection},
    path::{default_settings_path, normalize, PROJECT_FILE_NAME},
    sync::describe,
    run_pipeline, Completion, Pipeline, ServerProfile, SyncReporter, SyncSettings, Synchronizer,
    WebDavClient,
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use inquire::{Confirm, Password};
use std::{
    path::{self, Path, PathBuf},
    process::exit,
    sync::Arc,
    time::Duration,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "cartsync [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to project file.
    #[arg(short, long, global = true, value_name = "path", default_value = PROJECT_FILE_NAME)]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Init(opts) => run_init(&self.project, opts),
            Command::Clean(opts) => run_clean(&self.project, opts).await,
            Command::Upload(opts) => run_upload(&self.project, opts).await,
            Command::Directories => run_directories(&self.project).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Write new project file.
    #[command(override_usage = "cartsync init [options] <hostname> <username> <directory>")]
    Init(InitOptions),

    /// Wipe code directory and redeploy every project folder.
    #[command(override_usage = "cartsync clean [options]")]
    Clean(CleanOptions),

    /// Upload files into code directory.
    #[command(override_usage = "cartsync upload [options] <file>...")]
    Upload(UploadOptions),

    /// List code directories known to the server.
    #[command(override_usage = "cartsync directories [options]")]
    Directories,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Hostname of the instance.
    #[arg(value_name = "hostname")]
    pub hostname: String,

    /// Account name used for authentication.
    #[arg(value_name = "username")]
    pub username: String,

    /// Code directory to deploy into.
    #[arg(value_name = "directory")]
    pub directory: String,

    /// Project folders to deploy, relative to the project file.
    #[arg(short, long = "folder", value_name = "path")]
    pub folders: Vec<PathBuf>,

    /// Enable synchronization right away.
    #[arg(short, long)]
    pub enable: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CleanOptions {
    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UploadOptions {
    /// Files to upload.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,
}

/// Spinner driven by pipeline start and stop notifications.
struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Result<Self> {
        let style = ProgressStyle::with_template("{spinner:.green} {elapsed:.dim}  {msg}")?
            .tick_chars("-\\|/ ");
        let bar = ProgressBar::hidden();
        bar.set_style(style);
        Ok(Self { bar })
    }
}

impl SyncReporter for IndicatifReporter {
    fn started(&self, pipeline: &Pipeline) {
        self.bar.reset();
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_message(pipeline.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn finished(&self, pipeline: &Pipeline, outcome: &cartsync::sync::Result<Completion>) {
        self.bar.finish_and_clear();
        let message = describe(pipeline, outcome);
        match outcome {
            Ok(_) => info!("{message}"),
            Err(_) => error!("{message}"),
        }
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn run_init(project: &Path, opts: InitOptions) -> Result<()> {
    if project.exists() {
        bail!("project file {} already exists", project.display());
    }

    let config = ProjectConfig {
        server: ServerSection {
            hostname: opts.hostname,
            username: opts.username,
            password: None,
            directory: opts.directory,
            enabled: opts.enable,
        },
        folders: opts
            .folders
            .into_iter()
            .map(|path| FolderEntry { path })
            .collect(),
    };

    config.save(project)?;
    info!("wrote project file {}", project.display());

    Ok(())
}

async fn run_clean(project: &Path, opts: CleanOptions) -> Result<()> {
    let synchronizer = open_synchronizer(project)?;
    if !opts.yes {
        let proceed = Confirm::new(&format!(
            "Wipe code directory {} on {} and redeploy?",
            synchronizer.profile().code_directory,
            synchronizer.profile().hostname
        ))
        .with_default(false)
        .prompt()?;

        if !proceed {
            warn!("clean project aborted");
            return Ok(());
        }
    }

    let reporter = IndicatifReporter::new()?;
    run_pipeline(synchronizer, Pipeline::CleanProject, &reporter).await?;

    Ok(())
}

async fn run_upload(project: &Path, opts: UploadOptions) -> Result<()> {
    let synchronizer = open_synchronizer(project)?;
    let reporter = IndicatifReporter::new()?;
    for file in opts.files {
        let file = normalize(path::absolute(&file)?);
        run_pipeline(
            Arc::clone(&synchronizer),
            Pipeline::UploadFile(file),
            &reporter,
        )
        .await?;
    }

    Ok(())
}

async fn run_directories(project: &Path) -> Result<()> {
    let (config, profile) = load_profile(project)?;
    let client = WebDavClient::new(&profile)?;
    let directories = client.list_code_directories().await?;

    for directory in &directories {
        let marker = if directory.active { "*" } else { " " };
        println!("{marker} {}", directory.name);
    }

    if !directories
        .iter()
        .any(|directory| directory.name == config.server.directory)
    {
        warn!(
            "configured code directory {:?} does not exist on the server",
            config.server.directory
        );
    }

    Ok(())
}

fn load_profile(project: &Path) -> Result<(ProjectConfig, ServerProfile)> {
    let config = ProjectConfig::load(project)?;
    let settings = SyncSettings::load_or_default(default_settings_path()?)?;
    let password = match config.server.password.clone() {
        Some(password) => password,
        None => Password::new(&format!(
            "password for {}@{}",
            config.server.username, config.server.hostname
        ))
        .without_confirmation()
        .prompt()?,
    };

    let profile = ServerProfile::new(&config.server, password, &settings);
    Ok((config, profile))
}

fn open_synchronizer(project: &Path) -> Result<Arc<Synchronizer<WebDavClient>>> {
    let project = normalize(path::absolute(project)?);
    let (config, profile) = load_profile(&project)?;
    let base = project.parent().unwrap_or_else(|| Path::new("/"));
    let folders = config.project_folders(base);
    let client = WebDavClient::new(&profile)?;

    Ok(Arc::new(Synchronizer::new(client, profile, folders)))
}
