//! Task list: the cached `/tasks/` source and its newest-first rows.

use serde::Serialize;
use std::sync::Arc;
use ytmp3_api_client::VideoApi;
use ytmp3_core::{DownloadLink, Task, TaskStatus};

use crate::cache::{CacheKey, ResponseCache};
use crate::fetch::{fetcher, CachedFetch, FetchOptions};

/// Cache identifier of the task list.
pub const TASKS_CACHE_KEY: &str = "/tasks/";

/// Cached fetch of the task list through `api`.
pub fn task_list_fetch(api: Arc<dyn VideoApi>, cache: ResponseCache) -> CachedFetch<Vec<Task>> {
    CachedFetch::new(
        CacheKey::from(TASKS_CACHE_KEY),
        fetcher(move || {
            let api = Arc::clone(&api);
            async move { api.list_tasks().await }
        }),
        cache,
        FetchOptions::default(),
    )
}

/// Placeholder shown for an empty tag.
pub const EMPTY_FIELD: &str = "-";

/// One displayable row of the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub title: String,
    pub slug: String,
    pub artist: String,
    pub album: String,
    pub thumbnail: String,
    pub status: TaskStatus,
    /// Failure reason, when the conversion failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadLink>,
}

impl TaskRow {
    pub fn from_task(task: &Task, base_url: &str) -> Self {
        let status = task.status();
        let error = match &status {
            TaskStatus::Failed(message) => Some(message.clone()),
            _ => None,
        };
        Self {
            title: task.title.clone(),
            slug: task.slug.clone(),
            artist: or_placeholder(&task.artist),
            album: or_placeholder(&task.album),
            thumbnail: task.thumbnail.clone(),
            error,
            status,
            download: task.download_link(base_url),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// Rows for `tasks` (server order, oldest first), newest first.
pub fn task_rows(tasks: &[Task], base_url: &str) -> Vec<TaskRow> {
    tasks
        .iter()
        .rev()
        .map(|task| TaskRow::from_task(task, base_url))
        .collect()
}

fn or_placeholder(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(slug: &str, is_pending: bool) -> Task {
        Task {
            url: format!("https://youtu.be/{}", slug),
            thumbnail: String::new(),
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            artist: String::new(),
            album: "  ".to_string(),
            is_pending,
            result: (!is_pending).then(|| format!("/data/out/{}.mp3", slug)),
            error: None,
        }
    }

    #[test]
    fn test_rows_are_newest_first() {
        let tasks = vec![task("first", false), task("second", false), task("third", true)];
        let rows = task_rows(&tasks, "http://localhost:8080/api");
        let slugs: Vec<_> = rows.iter().map(|row| row.slug.as_str()).collect();
        assert_eq!(slugs, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_empty_tags_show_placeholder() {
        let row = TaskRow::from_task(&task("song", false), "/api");
        assert_eq!(row.artist, "-");
        assert_eq!(row.album, "-");
    }

    #[test]
    fn test_done_row_has_links() {
        let row = TaskRow::from_task(&task("song", false), "http://localhost:8080/api");
        assert_eq!(row.status, TaskStatus::Done);
        let link = row.download.unwrap();
        assert_eq!(link.view_url, "http://localhost:8080/api/get/song.mp3");
        assert_eq!(
            link.download_url,
            "http://localhost:8080/api/get/song.mp3?dl=true"
        );
    }

    #[test]
    fn test_pending_row_has_no_links() {
        let row = TaskRow::from_task(&task("song", true), "/api");
        assert!(row.is_pending());
        assert!(row.download.is_none());
        assert!(row.error.is_none());
    }

    #[test]
    fn test_failed_row_carries_reason() {
        let mut failed = task("song", false);
        failed.result = None;
        failed.error = Some("ffmpeg exited with status 1".to_string());

        let row = TaskRow::from_task(&failed, "/api");
        assert!(matches!(row.status, TaskStatus::Failed(_)));
        assert_eq!(row.error.as_deref(), Some("ffmpeg exited with status 1"));
        assert!(row.download.is_none());

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("download").is_none());
    }

    struct ListOnly(Vec<Task>);

    #[async_trait::async_trait]
    impl VideoApi for ListOnly {
        async fn list_tasks(&self) -> ytmp3_core::AppResult<Vec<Task>> {
            Ok(self.0.clone())
        }

        async fn video_info(&self, _url: &str) -> ytmp3_core::AppResult<ytmp3_core::VideoPreview> {
            Err(ytmp3_core::AppError::Unknown("not used".to_string()))
        }

        async fn create_task(
            &self,
            _body: &ytmp3_core::CreateTaskBody,
        ) -> ytmp3_core::AppResult<Task> {
            Err(ytmp3_core::AppError::Unknown("not used".to_string()))
        }
    }

    #[tokio::test]
    async fn test_task_list_fetch_fills_shared_cache() {
        let cache = ResponseCache::new();
        let api = Arc::new(ListOnly(vec![task("song", true)]));
        let tasks = task_list_fetch(api, cache.clone());
        tasks.mount().await;

        assert_eq!(tasks.data().map(|list| list.len()), Some(1));
        let seeded = task_list_fetch(Arc::new(ListOnly(vec![])), cache);
        assert_eq!(seeded.data().unwrap()[0].slug, "song");
    }
}
