//! ytmp3 CLI: command-line client for the video-to-MP3 conversion API.
//!
//! Set YTMP3_API_URL (or API_URL), or pass --api-url.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use ytmp3_api_client::{ApiClient, VideoApi};
use ytmp3_app::{
    task_list_fetch, task_rows, CachedFetch, FindOutcome, ResponseCache, SubmissionForm,
    SubmitOutcome, TaskWatcher,
};
use ytmp3_cli::{format_task_table, init_tracing, next_watch_step, WatchStep};
use ytmp3_core::{ClientConfig, DownloadKind, FormField, Task};

#[derive(Parser)]
#[command(name = "ytmp3", about = "Convert online videos to tagged MP3 files")]
struct Cli {
    /// API base address, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the metadata preview of a video
    Info {
        /// Video URL
        url: String,
    },
    /// Enqueue a conversion, optionally overriding the suggested tags
    Submit {
        /// Video URL
        url: String,
        /// Title tag; the slug follows it unless --slug is given
        #[arg(long)]
        title: Option<String>,
        /// Output file name (without extension)
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Keep polling the task list until the conversion finishes
        #[arg(long)]
        watch: bool,
    },
    /// List conversion tasks, newest first
    Tasks {
        /// Keep polling while any task is pending
        #[arg(long)]
        watch: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Download a converted file
    Download {
        /// Output file name as shown in the task list
        filename: String,
        /// Destination path (defaults to the file name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the link of a converted file
    Link {
        /// Output file name as shown in the task list
        filename: String,
        /// Link that forces a download instead of playing inline
        #[arg(long)]
        download: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn print_tasks(tasks: &[Task], base_url: &str, json: bool) -> anyhow::Result<()> {
    let rows = task_rows(tasks, base_url);
    if json {
        print_json(&rows)
    } else {
        print!("{}", format_task_table(&rows));
        Ok(())
    }
}

/// Print the task list on every settled update until nothing is pending or Ctrl-C.
///
/// Fails when the list cannot be loaded before any pending task was seen.
async fn watch_tasks(
    tasks: CachedFetch<Vec<Task>>,
    config: &ClientConfig,
    json: bool,
) -> anyhow::Result<()> {
    let mut updates = tasks.subscribe();
    let watcher = TaskWatcher::spawn(tasks.clone(), config.poll.clone());
    let mut seen_pending = false;

    let result = loop {
        let state = updates.borrow_and_update().clone();
        if let Some(error) = state.error.as_ref().filter(|_| !state.is_loading) {
            tracing::warn!(error = %error, "Task list refresh failed");
        }
        match next_watch_step(&state, &mut seen_pending) {
            WatchStep::Wait => {}
            WatchStep::Show { tasks: list, finished } => {
                if let Err(e) = print_tasks(&list, &config.api_url, json) {
                    break Err(e);
                }
                if finished {
                    break Ok(());
                }
            }
            WatchStep::Abort(error) => {
                break Err(anyhow::Error::new(error).context("Failed to load the task list"));
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break Ok(());
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
        }
    };

    watcher.shutdown().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context(
        "Invalid client configuration. Check YTMP3_API_URL (or API_URL) and YTMP3_POLL_*",
    )?;
    if let Some(api_url) = cli.api_url {
        config = config.with_api_url(api_url);
        config.validate()?;
    }

    let client = Arc::new(ApiClient::from_config(&config).context("Failed to create API client")?);

    match cli.command {
        Commands::Info { url } => {
            let mut form = SubmissionForm::new();
            match form.find_video(&*client, &url).await {
                FindOutcome::Found(preview) => print_json(&preview)?,
                _ => anyhow::bail!(form_error(&form)),
            }
        }
        Commands::Submit {
            url,
            title,
            slug,
            artist,
            album,
            watch,
        } => {
            let mut form = SubmissionForm::new();
            if !matches!(
                form.find_video(&*client, &url).await,
                FindOutcome::Found(_)
            ) {
                anyhow::bail!(form_error(&form));
            }
            if let Some(title) = title {
                form.set_title(title);
            }
            if let Some(slug) = slug {
                form.set_slug(slug);
            }
            if let Some(artist) = artist {
                form.set_artist(artist);
            }
            if let Some(album) = album {
                form.set_album(album);
            }

            let tasks = watch.then(|| {
                task_list_fetch(client.clone() as Arc<dyn VideoApi>, ResponseCache::new())
            });
            match form.submit(&*client, tasks.as_ref()).await {
                SubmitOutcome::Created(task) => print_json(&task)?,
                _ => anyhow::bail!(form_error(&form)),
            }
            if let Some(tasks) = tasks {
                watch_tasks(tasks, &config, false).await?;
            }
        }
        Commands::Tasks { watch, json } => {
            if watch {
                let tasks =
                    task_list_fetch(client.clone() as Arc<dyn VideoApi>, ResponseCache::new());
                tasks.mount().await;
                watch_tasks(tasks, &config, json).await?;
            } else {
                let list = client.list_tasks().await?;
                print_tasks(&list, &config.api_url, json)?;
            }
        }
        Commands::Download { filename, output } => {
            let dest = output.unwrap_or_else(|| PathBuf::from(&filename));
            let bytes = client
                .download_file(&filename, &dest)
                .await
                .with_context(|| format!("Download of '{}' failed", filename))?;
            print_json(&serde_json::json!({
                "file": dest.display().to_string(),
                "bytes": bytes,
            }))?;
        }
        Commands::Link { filename, download } => {
            let kind = if download {
                DownloadKind::Attachment
            } else {
                DownloadKind::View
            };
            println!("{}", client.file_url(&filename, kind));
        }
    }

    Ok(())
}

fn form_error(form: &SubmissionForm) -> String {
    form.errors()
        .get(FormField::Url)
        .or_else(|| form.errors().get(FormField::Result))
        .unwrap_or("Unknown error")
        .to_string()
}
