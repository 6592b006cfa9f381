use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Message used when the server reports a failure without readable text.
pub const CONVERSION_FAILED_MESSAGE: &str = "Conversion failed";

/// A server-tracked conversion job.
///
/// The client never mutates a task; it only re-fetches the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub is_pending: bool,
    /// Output path on the server, once converted.
    #[serde(default, deserialize_with = "deserialize_result")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "deserialize_task_error")]
    pub error: Option<String>,
}

/// Derived status of a task, as shown in the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Failed(String),
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Failed(_) => "error",
            TaskStatus::Done => "done",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.as_str())
    }
}

/// Serialized as its display name; the failure reason travels separately.
impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which disposition to ask the server for when fetching an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// Inline (play in browser)
    View,
    /// Forced download (`?dl=true`)
    Attachment,
}

/// Links to a finished task's output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub filename: String,
    pub view_url: String,
    pub download_url: String,
}

/// Build the URL of an output file served under `<base>/get/<filename>`.
pub fn file_url(base_url: &str, filename: &str, kind: DownloadKind) -> String {
    let url = format!(
        "{}/get/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(filename)
    );
    match kind {
        DownloadKind::View => url,
        DownloadKind::Attachment => format!("{}?dl=true", url),
    }
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.is_pending {
            return TaskStatus::Pending;
        }
        match &self.error {
            Some(message) => TaskStatus::Failed(message.clone()),
            None => TaskStatus::Done,
        }
    }

    /// File name of the converted output (last path segment of `result`).
    pub fn output_filename(&self) -> Option<&str> {
        if self.is_pending {
            return None;
        }
        let result = self.result.as_deref()?;
        result
            .rsplit('/')
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Download links for a completed task. `None` while pending or without output.
    pub fn download_link(&self, base_url: &str) -> Option<DownloadLink> {
        let filename = self.output_filename()?;
        Some(DownloadLink {
            filename: filename.to_string(),
            view_url: file_url(base_url, filename, DownloadKind::View),
            download_url: file_url(base_url, filename, DownloadKind::Attachment),
        })
    }
}

/// True when at least one task in the list is still converting.
pub fn has_pending(tasks: &[Task]) -> bool {
    tasks.iter().any(|task| task.is_pending)
}

fn deserialize_result<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// The server may encode its error as a string, null, or an opaque object.
fn deserialize_task_error<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(CONVERSION_FAILED_MESSAGE)
                .to_string(),
        ),
        Value::Bool(false) => None,
        _ => Some(CONVERSION_FAILED_MESSAGE.to_string()),
    })
}
