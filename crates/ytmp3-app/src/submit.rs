//! Submission workflow: find a video, edit its tags, enqueue a conversion.
//!
//! The form is a small state machine (`Searching` -> `Previewing` ->
//! `Submitting` -> back to `Searching`, or `Previewing` with a form-level
//! error). Each network step is split into a synchronous `start_*` call that
//! validates and moves to the loading state, and a `finish_*` call that
//! applies the response, so a renderer can observe every state. The async
//! [`SubmissionForm::find_video`] and [`SubmissionForm::submit`] wrap both.

use std::collections::BTreeMap;
use ytmp3_api_client::VideoApi;
use ytmp3_core::{
    slugify, validate_video_url, AppError, AppResult, CreateTaskBody, ErrorMetadata, FormField,
    TagFields, Task, ValidationError, VideoPreview,
};

use crate::fetch::CachedFetch;
use crate::report::log_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// Waiting for a URL, or fetching its preview
    Searching,
    /// Preview loaded; tag fields editable
    Previewing,
    /// Task creation request in flight
    Submitting,
}

/// Error messages keyed by the form slot they are shown in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FindOutcome {
    Found(VideoPreview),
    Rejected(ValidationError),
    Failed(String),
    /// A request was already in flight
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Task),
    Rejected(ValidationError),
    Failed(String),
    /// A request was already in flight
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SubmissionForm {
    phase: FormPhase,
    url_input: String,
    video: Option<VideoPreview>,
    tags: TagFields,
    errors: FormErrors,
    is_loading: bool,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self {
            phase: FormPhase::Searching,
            url_input: String::new(),
            video: None,
            tags: TagFields::default(),
            errors: FormErrors::default(),
            is_loading: false,
        }
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    pub fn video(&self) -> Option<&VideoPreview> {
        self.video.as_ref()
    }

    pub fn tags(&self) -> &TagFields {
        &self.tags
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url_input = url.into();
    }

    /// Edit the title; the slug follows it.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.tags.title = title.into();
        self.tags.slug = slugify(&self.tags.title);
    }

    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.tags.slug = slug.into();
    }

    pub fn set_artist(&mut self, artist: impl Into<String>) {
        self.tags.artist = artist.into();
    }

    pub fn set_album(&mut self, album: impl Into<String>) {
        self.tags.album = album.into();
    }

    /// Clear every field, the preview and all errors.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Validate `raw_url` and enter the loading state.
    ///
    /// Returns the URL to request, or `None` when the input was rejected or a
    /// request is already in flight. Any previous preview is discarded.
    pub fn start_find(&mut self, raw_url: &str) -> Option<String> {
        if self.is_loading {
            return None;
        }
        self.errors.clear();
        self.video = None;
        self.tags = TagFields::default();
        self.phase = FormPhase::Searching;
        self.url_input = raw_url.to_string();

        match validate_video_url(raw_url) {
            Ok(url) => {
                self.is_loading = true;
                Some(url.to_string())
            }
            Err(err) => {
                self.reject(err);
                None
            }
        }
    }

    pub fn finish_find(&mut self, result: AppResult<VideoPreview>) {
        self.is_loading = false;
        match result {
            Ok(preview) => {
                self.tags = TagFields::from(&preview);
                self.video = Some(preview);
                self.phase = FormPhase::Previewing;
            }
            Err(err) => {
                log_error(&err, "Video preview failed");
                self.errors.set(FormField::Url, err.client_message());
            }
        }
    }

    /// Check the submit preconditions and enter the submitting state.
    ///
    /// Returns the task creation payload, or `None` when rejected (the error
    /// is recorded against the offending field) or a request is already in
    /// flight. Title and slug must not be blank.
    pub fn start_submit(&mut self) -> Option<CreateTaskBody> {
        if self.is_loading {
            return None;
        }
        self.errors.clear();

        if let Err(err) = self.check_submittable() {
            self.reject(err);
            return None;
        }
        let video = self.video.as_ref()?;

        let body = CreateTaskBody::from_preview(video, &self.tags);
        self.is_loading = true;
        self.phase = FormPhase::Submitting;
        Some(body)
    }

    pub fn finish_submit(&mut self, result: &AppResult<Task>) {
        self.is_loading = false;
        match result {
            Ok(_) => self.reset(),
            Err(err) => {
                log_error(err, "Task submission failed");
                self.phase = FormPhase::Previewing;
                self.errors.set(FormField::Result, err.client_message());
            }
        }
    }

    fn reject(&mut self, err: ValidationError) {
        let field = err.field();
        let err = AppError::from(err);
        log_error(&err, "Form input rejected");
        self.errors.set(field, err.client_message());
    }

    fn check_submittable(&self) -> Result<(), ValidationError> {
        validate_video_url(&self.url_input)?;
        if self.video.is_none() {
            return Err(ValidationError::NoPreview);
        }
        if self.tags.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.tags.slug.trim().is_empty() {
            return Err(ValidationError::MissingSlug);
        }
        Ok(())
    }

    /// Validate the URL and fetch its preview.
    pub async fn find_video(&mut self, api: &dyn VideoApi, raw_url: &str) -> FindOutcome {
        if self.is_loading {
            return FindOutcome::Ignored;
        }
        let Some(url) = self.start_find(raw_url) else {
            return FindOutcome::Rejected(ValidationError::InvalidUrl);
        };

        let result = api.video_info(&url).await;
        let outcome = match &result {
            Ok(preview) => FindOutcome::Found(preview.clone()),
            Err(err) => FindOutcome::Failed(err.client_message()),
        };
        self.finish_find(result);
        outcome
    }

    /// Submit the previewed video with the edited tags.
    ///
    /// On success the form is cleared and, when `tasks` is given, a task list
    /// re-fetch is spawned without waiting for it. Polling stays the
    /// authoritative way the list catches up.
    pub async fn submit(
        &mut self,
        api: &dyn VideoApi,
        tasks: Option<&CachedFetch<Vec<Task>>>,
    ) -> SubmitOutcome {
        if self.is_loading {
            return SubmitOutcome::Ignored;
        }
        let Some(body) = self.start_submit() else {
            let err = self
                .check_submittable()
                .err()
                .unwrap_or(ValidationError::NoPreview);
            return SubmitOutcome::Rejected(err);
        };

        let result = api.create_task(&body).await;
        self.finish_submit(&result);

        match result {
            Ok(task) => {
                tracing::info!(slug = %task.slug, title = %task.title, "Conversion task submitted");
                if let Some(tasks) = tasks {
                    let tasks = tasks.clone();
                    tokio::spawn(async move {
                        tasks.refetch().await;
                    });
                }
                SubmitOutcome::Created(task)
            }
            Err(err) => SubmitOutcome::Failed(err.client_message()),
        }
    }
}
