use std::fmt::Write;
use ytmp3_app::{FetchState, TaskRow};
use ytmp3_core::{has_pending, AppError, Task};

/// What `--watch` does with the latest task list state.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchStep {
    /// Nothing settled yet, or the poller is retrying
    Wait,
    /// Print the list; `finished` when no task is pending
    Show { tasks: Vec<Task>, finished: bool },
    /// The list could not be loaded and no conversion was being tracked
    Abort(AppError),
}

/// Decide the next watch step. `seen_pending` records whether any list shown
/// so far had a pending task.
pub fn next_watch_step(state: &FetchState<Vec<Task>>, seen_pending: &mut bool) -> WatchStep {
    if state.is_loading {
        return WatchStep::Wait;
    }
    match (&state.data, &state.error) {
        (Some(tasks), _) => {
            let pending = has_pending(tasks);
            *seen_pending |= pending;
            WatchStep::Show {
                tasks: tasks.clone(),
                finished: !pending,
            }
        }
        (None, Some(error)) if !*seen_pending => WatchStep::Abort(error.clone()),
        _ => WatchStep::Wait,
    }
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render task rows as a fixed-width table.
pub fn format_task_table(rows: &[TaskRow]) -> String {
    if rows.is_empty() {
        return "No tasks yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<32} {:<20} {:<20} {}",
        "Status", "Title", "Artist", "Album", "Download"
    );
    let _ = writeln!(out, "{}", "-".repeat(110));

    for row in rows {
        let last_column = match (&row.download, &row.error) {
            (Some(link), _) => link.download_url.clone(),
            (None, Some(error)) => truncate_string(error, 40),
            (None, None) => String::new(),
        };
        let _ = writeln!(
            out,
            "{:<8} {:<32} {:<20} {:<20} {}",
            row.status,
            truncate_string(&row.title, 32),
            truncate_string(&row.artist, 20),
            truncate_string(&row.album, 20),
            last_column
        );
    }
    out
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytmp3_core::{DownloadLink, TaskStatus};

    fn row(title: &str, status: TaskStatus) -> TaskRow {
        TaskRow {
            title: title.to_string(),
            slug: "slug".to_string(),
            artist: "-".to_string(),
            album: "-".to_string(),
            thumbnail: String::new(),
            status,
            error: None,
            download: None,
        }
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_exact() {
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_chars() {
        assert_eq!(truncate_string("Beyoncé Knowles", 10), "Beyoncé...");
        assert_eq!(truncate_string("日本語のタイトル", 8), "日本語のタイトル");
    }

    #[test]
    fn task_table_empty() {
        assert_eq!(format_task_table(&[]), "No tasks yet.\n");
    }

    #[test]
    fn task_table_rows() {
        let mut done = row("Song", TaskStatus::Done);
        done.download = Some(DownloadLink {
            filename: "song.mp3".to_string(),
            view_url: "http://h/api/get/song.mp3".to_string(),
            download_url: "http://h/api/get/song.mp3?dl=true".to_string(),
        });
        let mut failed = row("Broken", TaskStatus::Failed("Conversion failed".to_string()));
        failed.error = Some("Conversion failed".to_string());

        let table = format_task_table(&[row("Pending one", TaskStatus::Pending), done, failed]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Status"));
        assert!(lines[2].starts_with("pending  Pending one"));
        assert!(lines[3].ends_with("http://h/api/get/song.mp3?dl=true"));
        assert!(lines[4].ends_with("Conversion failed"));
    }

    fn task(is_pending: bool) -> Task {
        Task {
            url: "https://youtu.be/abc".to_string(),
            thumbnail: String::new(),
            title: "Song".to_string(),
            slug: "song".to_string(),
            artist: String::new(),
            album: String::new(),
            is_pending,
            result: (!is_pending).then(|| "/data/song.mp3".to_string()),
            error: None,
        }
    }

    fn state(data: Option<Vec<Task>>, error: Option<AppError>) -> FetchState<Vec<Task>> {
        FetchState {
            data,
            is_loading: false,
            error,
        }
    }

    #[test]
    fn watch_aborts_when_first_fetch_fails() {
        let mut seen_pending = false;
        let step = next_watch_step(
            &state(None, Some(AppError::Transport("refused".to_string()))),
            &mut seen_pending,
        );
        assert!(matches!(step, WatchStep::Abort(AppError::Transport(_))));
    }

    #[test]
    fn watch_waits_out_failures_while_tracking_pending() {
        let mut seen_pending = false;
        let step = next_watch_step(&state(Some(vec![task(true)]), None), &mut seen_pending);
        assert!(matches!(step, WatchStep::Show { finished: false, .. }));
        assert!(seen_pending);

        let step = next_watch_step(
            &state(None, Some(AppError::request(502, "Bad Gateway"))),
            &mut seen_pending,
        );
        assert_eq!(step, WatchStep::Wait);

        let step = next_watch_step(&state(Some(vec![task(false)]), None), &mut seen_pending);
        assert!(matches!(step, WatchStep::Show { finished: true, .. }));
    }

    #[test]
    fn watch_waits_while_loading_or_unsettled() {
        let mut seen_pending = false;
        let mut loading = state(None, Some(AppError::Unknown("x".to_string())));
        loading.is_loading = true;
        assert_eq!(next_watch_step(&loading, &mut seen_pending), WatchStep::Wait);
        assert_eq!(next_watch_step(&state(None, None), &mut seen_pending), WatchStep::Wait);
    }
}
