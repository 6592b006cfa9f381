//! Domain methods for the ytmp3 API client.
//!
//! [`VideoApi`] is the seam the client workflows depend on; [`ApiClient`]
//! implements it over HTTP.

use crate::{ApiClient, RequestOptions};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use ytmp3_core::{
    file_url, AppError, AppResult, CreateTaskBody, DownloadKind, Task, VideoPreview,
};

/// Operations of the conversion API used by the task list and the submission form.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// All tracked tasks, oldest first.
    async fn list_tasks(&self) -> AppResult<Vec<Task>>;

    /// Metadata preview for a video URL.
    async fn video_info(&self, url: &str) -> AppResult<VideoPreview>;

    /// Enqueue a conversion task.
    async fn create_task(&self, body: &CreateTaskBody) -> AppResult<Task>;
}

impl ApiClient {
    pub async fn list_tasks(&self) -> AppResult<Vec<Task>> {
        self.call("/tasks/", RequestOptions::get()).await
    }

    pub async fn video_info(&self, url: &str) -> AppResult<VideoPreview> {
        let path = format!("/info?url={}", urlencoding::encode(url));
        self.call(&path, RequestOptions::get()).await
    }

    #[tracing::instrument(skip(self, body), fields(slug = %body.slug))]
    pub async fn create_task(&self, body: &CreateTaskBody) -> AppResult<Task> {
        let task: Task = self
            .call("/tasks/", RequestOptions::post_json(body)?)
            .await?;
        tracing::info!(url = %task.url, title = %task.title, "Task created");
        Ok(task)
    }

    /// Absolute URL of an output file (does not call the API).
    pub fn file_url(&self, filename: &str, kind: DownloadKind) -> String {
        file_url(&self.base_url, filename, kind)
    }

    /// Stream `GET /get/<filename>?dl=true` into `dest`. Returns the number of bytes written.
    ///
    /// The body goes to `<dest>.part` first and is renamed onto `dest` once
    /// complete; a failed download leaves nothing behind.
    pub async fn download_file(&self, filename: &str, dest: &Path) -> AppResult<u64> {
        let filename = filename.trim();
        if !is_plain_file_name(filename) {
            return Err(AppError::Unknown(format!(
                "Invalid output file name: '{}'",
                filename
            )));
        }

        let path = format!("/get/{}", urlencoding::encode(filename));
        let mut response = self
            .send(&path, RequestOptions::get().query("dl", "true"))
            .await?;

        let part = partial_path(dest);
        let written = match write_body(&mut response, &part).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&part).await {
                    tracing::debug!(error = %remove_err, path = %part.display(), "Could not remove partial download");
                }
                tracing::warn!(filename = %filename, error = %e, "Download failed");
                return Err(e);
            }
        };
        tokio::fs::rename(&part, dest).await?;

        tracing::info!(filename = %filename, bytes = written, dest = %dest.display(), "Downloaded output file");
        Ok(written)
    }
}

/// A single path segment: no separators and not `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(response: &mut reqwest::Response, path: &Path) -> AppResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::Transport(e.to_string()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl VideoApi for ApiClient {
    async fn list_tasks(&self) -> AppResult<Vec<Task>> {
        ApiClient::list_tasks(self).await
    }

    async fn video_info(&self, url: &str) -> AppResult<VideoPreview> {
        ApiClient::video_info(self, url).await
    }

    async fn create_task(&self, body: &CreateTaskBody) -> AppResult<Task> {
        ApiClient::create_task(self, body).await
    }
}
