//! ytmp3 client workflows
//!
//! Everything a front end needs on top of the HTTP client: a shared response
//! cache with per-source fetch state, the task list poller, and the video
//! submission form.

pub mod cache;
pub mod fetch;
pub mod poll;
pub mod report;
pub mod submit;
pub mod task_list;

pub use cache::{CacheKey, ResponseCache};
pub use fetch::{fetcher, CachedFetch, FetchOptions, FetchState, Fetcher, RefetchOutcome};
pub use report::log_error;
pub use poll::{backoff_delay, PollState, TaskPoller, TaskWatcher};
pub use submit::{FindOutcome, FormErrors, FormPhase, SubmissionForm, SubmitOutcome};
pub use task_list::{task_list_fetch, task_rows, TaskRow, EMPTY_FIELD, TASKS_CACHE_KEY};
