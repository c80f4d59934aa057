//! Generation lifecycle controller.
//!
//! Owns one session: the [`Configuration`], the lifecycle state, the current
//! result and any notices. At most one generation attempt is in flight; a
//! trigger received while processing is dropped, not queued.

use crate::client::GenerationClient;
use crate::error::{PixlyError, Result};
use crate::image::ImageData;
use crate::loader;
use crate::model::{Configuration, FieldEdit, ImageField};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;

/// Message shown when the provider credential is missing.
pub const MISSING_CREDENTIAL_MESSAGE: &str = "API key missing. Check environment configuration.";
/// Message shown when a generation attempt fails.
pub const GENERATION_FAILED_MESSAGE: &str = "Error generating content. Please try again.";

/// Whether a generation attempt is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No attempt in flight.
    #[default]
    Idle,
    /// An attempt is waiting on the generation client.
    Processing,
}

/// A user-facing notice raised by the last trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Generation was refused because of missing configuration.
    Configuration(String),
    /// The last attempt failed. The reason is only logged.
    GenerationFailed,
}

impl Notice {
    /// Text to show the user.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(msg) => msg,
            Self::GenerationFailed => GENERATION_FAILED_MESSAGE,
        }
    }
}

/// Why a trigger did not start an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No product image is set.
    MissingProductImage,
    /// Another attempt is still processing.
    AlreadyProcessing,
}

/// Outcome of one generate trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Attempt {
    /// The attempt succeeded and its image is the current result.
    Completed,
    /// The attempt failed; [`Notice::GenerationFailed`] is raised.
    Failed,
    /// Not started; a [`Notice::Configuration`] is raised.
    Refused,
    /// Not started; the trigger should have been disabled.
    Ignored(IgnoreReason),
}

/// Snapshot of a session for rendering.
#[derive(Debug, Clone)]
pub struct SessionView {
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Current configuration.
    pub config: Configuration,
    /// Image from the last successful attempt, if it is still displayed.
    pub result: Option<ImageData>,
    /// Notice from the last trigger.
    pub notice: Option<Notice>,
    /// File read failures, scoped to the image field they were meant for.
    pub file_errors: BTreeMap<ImageField, String>,
}

impl SessionView {
    /// Whether the generate trigger should be enabled.
    pub fn can_generate(&self) -> bool {
        self.state == LifecycleState::Idle && self.config.is_ready()
    }

    /// Whether the last attempt failed.
    pub fn generation_failed(&self) -> bool {
        self.notice == Some(Notice::GenerationFailed)
    }

    /// Whether an attempt is in flight.
    pub fn is_processing(&self) -> bool {
        self.state == LifecycleState::Processing
    }
}

#[derive(Debug, Default)]
struct Session {
    config: Configuration,
    state: LifecycleState,
    result: Option<ImageData>,
    notice: Option<Notice>,
    file_errors: BTreeMap<ImageField, String>,
}

/// Drives generation attempts for one session.
pub struct Controller<C> {
    client: C,
    session: Mutex<Session>,
}

impl<C: GenerationClient> Controller<C> {
    /// Creates a controller with a default configuration.
    pub fn new(client: C) -> Self {
        Self::with_config(client, Configuration::default())
    }

    /// Creates a controller starting from `config`.
    pub fn with_config(client: C, config: Configuration) -> Self {
        Self {
            client,
            session: Mutex::new(Session {
                config,
                ..Session::default()
            }),
        }
    }

    /// The generation client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fails with [`PixlyError::Configuration`] when the client has no credential.
    pub fn check_credential(&self) -> Result<()> {
        if self.client.credential_configured() {
            Ok(())
        } else {
            Err(PixlyError::Configuration(MISSING_CREDENTIAL_MESSAGE.into()))
        }
    }

    /// Returns a snapshot of the session.
    pub fn view(&self) -> SessionView {
        let session = self.session.lock();
        SessionView {
            state: session.state,
            config: session.config.clone(),
            result: session.result.clone(),
            notice: session.notice.clone(),
            file_errors: session.file_errors.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.session.lock().state
    }

    /// Current configuration.
    pub fn config(&self) -> Configuration {
        self.session.lock().config.clone()
    }

    /// Current result, if any.
    pub fn result(&self) -> Option<ImageData> {
        self.session.lock().result.clone()
    }

    /// Applies one field edit.
    ///
    /// Edits made while processing only affect later attempts.
    pub fn set_field(&self, edit: FieldEdit) {
        tracing::trace!(field = edit.field_name(), "field edit");
        self.session.lock().config.set_field(edit);
    }

    /// Parses and applies a string-keyed field edit.
    pub fn set_field_str(&self, name: &str, value: &str) -> Result<()> {
        let edit = FieldEdit::parse(name, value)?;
        self.set_field(edit);
        Ok(())
    }

    /// Loads a local file into an image field.
    ///
    /// The field is only updated once the read succeeds; on failure it keeps
    /// its prior value and a notice scoped to the field is recorded.
    pub async fn load_image(&self, field: ImageField, path: impl AsRef<Path>) -> Result<()> {
        let loaded = loader::load_file(field, path).await;
        self.apply_load(field, loaded)
    }

    /// Loads already-read file contents into an image field.
    pub fn load_image_bytes(
        &self,
        field: ImageField,
        bytes: Vec<u8>,
        name_hint: Option<&str>,
    ) -> Result<()> {
        let loaded = loader::load_bytes(field, bytes, name_hint);
        self.apply_load(field, loaded)
    }

    fn apply_load(&self, field: ImageField, loaded: Result<ImageData>) -> Result<()> {
        let mut session = self.session.lock();
        match loaded {
            Ok(image) => {
                tracing::debug!(%field, size = image.size(), format = ?image.format(), "image loaded");
                session.file_errors.remove(&field);
                session.config.set_field(FieldEdit::image(field, Some(image)));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%field, "failed to load image: {e}");
                session.file_errors.insert(field, e.to_string());
                Err(e)
            }
        }
    }

    /// Clears the current notice.
    pub fn dismiss_notice(&self) {
        self.session.lock().notice = None;
    }

    /// Handles a generate trigger.
    ///
    /// The attempt uses a snapshot of the configuration taken when it starts.
    /// There is no cancellation; if the returned future is dropped mid-flight
    /// the session returns to idle without a result.
    pub async fn generate(&self) -> Attempt {
        let config = {
            let mut session = self.session.lock();
            if session.state == LifecycleState::Processing {
                tracing::debug!("generate trigger dropped: attempt already in flight");
                return Attempt::Ignored(IgnoreReason::AlreadyProcessing);
            }
            if !session.config.is_ready() {
                tracing::warn!("generate trigger ignored: no product image");
                return Attempt::Ignored(IgnoreReason::MissingProductImage);
            }
            if let Err(PixlyError::Configuration(message)) = self.check_credential() {
                tracing::warn!(client = self.client.name(), "generation refused: {message}");
                session.notice = Some(Notice::Configuration(message));
                return Attempt::Refused;
            }

            session.state = LifecycleState::Processing;
            session.result = None;
            session.notice = None;
            session.config.clone()
        };

        tracing::info!(
            client = self.client.name(),
            subject = %config.subject_type(),
            style = %config.style(),
            ratio = %config.ratio(),
            "generation started"
        );

        let in_flight = InFlight {
            session: &self.session,
            finished: false,
        };
        let outcome = self.client.generate(&config).await;
        in_flight.finish(|session| match outcome {
            Ok(image) => {
                tracing::info!(size = image.size(), format = ?image.format(), "generation completed");
                session.result = Some(image);
                Attempt::Completed
            }
            Err(e) => {
                let provider = e.provider_error();
                tracing::error!(
                    retryable = provider.is_some_and(|p| p.is_retryable()),
                    status = provider.and_then(|p| p.status()),
                    "generation failed: {e}"
                );
                session.notice = Some(Notice::GenerationFailed);
                Attempt::Failed
            }
        })
    }
}

/// Returns the session to idle when an attempt ends, however it ends.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, apply: impl FnOnce(&mut Session) -> Attempt) -> Attempt {
        let mut session = self.session.lock();
        session.state = LifecycleState::Idle;
        self.finished = true;
        apply(&mut session)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("generation attempt abandoned before completion");
            self.session.lock().state = LifecycleState::Idle;
        }
    }
}
