//! Upload area interaction state machine.
//!
//! ```text
//!            drag-enter                 drop (first file)
//!   Idle ───────────────▶ Dragging ─────────────────────▶ Loading
//!    ▲  ◀─────────────── (drag-leave exits)                │   │
//!    │                                              Valid  │   │ Invalid
//!    │  Delete / Backspace / remove                        ▼   ▼
//!    └──────────────────────────────────────────── HasPreview  Error
//! ```
//!
//! [`transition`] is the whole table as a pure function. [`UploadController`]
//! owns the state, the current preview and its revocable display handle, and
//! applies side effects: opening the picker, starting an attempt, invoking the
//! caller's callback, and releasing handles.
//!
//! Attempts are identified by [`AttemptId`]. Only the latest attempt may
//! complete; completions for an attempt invalidated by [`reset`] or
//! [`dispose`] are discarded, so a late pipeline result never mutates a
//! torn-down area.
//!
//! [`reset`]: UploadController::reset
//! [`dispose`]: UploadController::dispose

use crate::config::UploadConfig;
use crate::error::ValidationOutcome;
use crate::imaging::ImageBackend;
use crate::pipeline::{Accepted, UploadPipeline};
use crate::resource::{ObjectUrl, ResourceRegistry};
use crate::types::CandidateFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Dragging,
    Loading,
    HasPreview,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Delete,
    Backspace,
    Other,
}

/// Input from the user or the platform.
#[derive(Debug, Clone)]
pub enum Event {
    DragEnter {
        has_files: bool,
    },
    /// `exits_boundary` is the containment check: false when the pointer
    /// merely crossed onto a child element of the drop zone.
    DragLeave {
        exits_boundary: bool,
    },
    Drop {
        files: Vec<CandidateFile>,
    },
    Click,
    KeyDown(Key),
    /// The file picker closed. Empty when the user cancelled.
    FilesSelected(Vec<CandidateFile>),
    Remove,
}

/// Payload-free classification of an input, as seen by [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    DragEnter { has_files: bool },
    DragLeave { exits_boundary: bool },
    Drop { file_count: usize },
    /// Click, Enter or Space.
    Browse,
    Selected { file_count: usize },
    /// Delete, Backspace or the remove button.
    Remove,
    Resolved { accepted: bool },
}

impl Trigger {
    fn from_event(event: &Event) -> Option<Self> {
        Some(match event {
            Event::DragEnter { has_files } => Self::DragEnter {
                has_files: *has_files,
            },
            Event::DragLeave { exits_boundary } => Self::DragLeave {
                exits_boundary: *exits_boundary,
            },
            Event::Drop { files } => Self::Drop {
                file_count: files.len(),
            },
            Event::Click | Event::KeyDown(Key::Enter) | Event::KeyDown(Key::Space) => Self::Browse,
            Event::KeyDown(Key::Delete) | Event::KeyDown(Key::Backspace) | Event::Remove => {
                Self::Remove
            }
            Event::KeyDown(Key::Other) => return None,
            Event::FilesSelected(files) => Self::Selected {
                file_count: files.len(),
            },
        })
    }

    fn is_user_input(self) -> bool {
        !matches!(self, Self::Resolved { .. })
    }
}

/// What [`transition`] needs to know besides the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    pub disabled: bool,
    pub has_preview: bool,
    /// The file picker is open (as opposed to an attempt running).
    pub picker_open: bool,
    /// State to return to when a drag is abandoned.
    pub resting: InteractionState,
}

/// The interaction table. `None` means the input is ignored.
pub fn transition(
    state: InteractionState,
    trigger: Trigger,
    ctx: &TransitionContext,
) -> Option<InteractionState> {
    use InteractionState::*;

    if ctx.disabled && trigger.is_user_input() {
        return None;
    }

    match (state, trigger) {
        (Idle | HasPreview | Error, Trigger::DragEnter { has_files: true }) => Some(Dragging),
        (Dragging, Trigger::DragLeave { exits_boundary: true }) => Some(ctx.resting),
        (Dragging, Trigger::Drop { file_count: 0 }) => Some(ctx.resting),
        (Dragging, Trigger::Drop { .. }) => Some(Loading),
        (Idle | Error, Trigger::Browse) if !ctx.has_preview => Some(Loading),
        (Loading, Trigger::Selected { file_count: 0 }) if ctx.picker_open => Some(Idle),
        (Loading, Trigger::Selected { .. }) if ctx.picker_open => Some(Loading),
        (HasPreview | Error, Trigger::Remove) if ctx.has_preview => Some(Idle),
        (Loading, Trigger::Resolved { accepted: true }) if !ctx.picker_open => Some(HasPreview),
        (Loading, Trigger::Resolved { accepted: false }) if !ctx.picker_open => Some(Error),
        _ => None,
    }
}

/// Identifies one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

/// A pipeline run the caller must execute and report back via
/// [`UploadController::complete`].
#[derive(Debug)]
pub struct Attempt {
    pub id: AttemptId,
    pub file: CandidateFile,
}

/// Side effect requested by the controller.
#[derive(Debug)]
pub enum Effect {
    /// Nothing changed.
    Ignored,
    /// State changed; re-render.
    Changed,
    /// Show the operating system file picker, then send
    /// [`Event::FilesSelected`].
    OpenPicker,
    /// Run the pipeline on this file.
    Start(Attempt),
    /// Another attempt is still running; this input was rejected.
    Busy,
}

/// The currently displayed image.
#[derive(Debug)]
pub struct Preview {
    payload: String,
    handle: Option<ObjectUrl>,
}

impl Preview {
    /// The self-contained payload given to the callback.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// What to display: the revocable handle when there is one.
    pub fn src(&self) -> &str {
        self.handle
            .as_ref()
            .map(ObjectUrl::as_str)
            .unwrap_or(&self.payload)
    }
}

/// Receives `(file, preview)` on success and `(None, None)` on removal.
pub type SelectCallback = Box<dyn FnMut(Option<&CandidateFile>, Option<&str>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Picker,
    Attempt(AttemptId),
}

pub struct UploadController {
    state: InteractionState,
    resting: InteractionState,
    pending: Pending,
    next_attempt: u64,
    error: Option<String>,
    preview: Option<Preview>,
    label: String,
    required: bool,
    disabled: bool,
    disposed: bool,
    registry: ResourceRegistry,
    on_select: SelectCallback,
}

impl UploadController {
    pub fn new(config: &UploadConfig, registry: ResourceRegistry, on_select: SelectCallback) -> Self {
        Self {
            state: InteractionState::Idle,
            resting: InteractionState::Idle,
            pending: Pending::None,
            next_attempt: 0,
            error: None,
            preview: None,
            label: config.label.clone(),
            required: config.required,
            disabled: config.disabled,
            disposed: false,
            registry,
            on_select,
        }
    }

    /// Start in `HasPreview` showing an image the caller already has.
    ///
    /// The payload is not owned by the registry, so nothing is released for
    /// it later.
    pub fn with_existing_preview(mut self, payload: impl Into<String>) -> Self {
        self.preview = Some(Preview {
            payload: payload.into(),
            handle: None,
        });
        self.state = InteractionState::HasPreview;
        self.resting = InteractionState::HasPreview;
        self
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    fn context(&self) -> TransitionContext {
        TransitionContext {
            disabled: self.disabled,
            has_preview: self.preview.is_some(),
            picker_open: self.pending == Pending::Picker,
            resting: self.resting,
        }
    }

    fn attempt_running(&self) -> bool {
        matches!(self.pending, Pending::Attempt(_))
    }

    fn enter(&mut self, next: InteractionState) {
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "upload area transition");
        }
        if next != InteractionState::Dragging && next != InteractionState::Loading {
            self.resting = next;
        }
        self.state = next;
    }

    /// Feed one user or platform event.
    pub fn handle(&mut self, event: Event) -> Effect {
        if self.disposed || self.disabled {
            return Effect::Ignored;
        }
        let Some(trigger) = Trigger::from_event(&event) else {
            return Effect::Ignored;
        };
        let Some(next) = transition(self.state, trigger, &self.context()) else {
            if self.attempt_running()
                && matches!(
                    trigger,
                    Trigger::Drop { .. } | Trigger::Browse | Trigger::DragEnter { .. }
                )
            {
                tracing::debug!(?trigger, "rejected while an upload is in progress");
                return Effect::Busy;
            }
            return Effect::Ignored;
        };

        match (trigger, event) {
            (Trigger::Drop { .. }, Event::Drop { files })
            | (Trigger::Selected { .. }, Event::FilesSelected(files)) => {
                match files.into_iter().next() {
                    Some(file) => self.begin(file),
                    None => {
                        self.pending = Pending::None;
                        self.enter(next);
                        Effect::Changed
                    }
                }
            }
            (Trigger::Browse, _) => {
                self.error = None;
                self.pending = Pending::Picker;
                self.enter(next);
                Effect::OpenPicker
            }
            (Trigger::Remove, _) => {
                self.remove();
                Effect::Changed
            }
            _ => {
                self.enter(next);
                Effect::Changed
            }
        }
    }

    fn begin(&mut self, file: CandidateFile) -> Effect {
        self.next_attempt += 1;
        let id = AttemptId(self.next_attempt);
        self.pending = Pending::Attempt(id);
        self.error = None;
        self.enter(InteractionState::Loading);
        tracing::debug!(attempt = id.0, file = file.name(), "upload attempt started");
        Effect::Start(Attempt { id, file })
    }

    /// Drop the preview, releasing its handle, and tell the caller.
    fn remove(&mut self) {
        if let Some(handle) = self.preview.take().and_then(|p| p.handle) {
            handle.revoke();
        }
        self.error = None;
        self.enter(InteractionState::Idle);
        (self.on_select)(None, None);
    }

    /// Report the outcome of an attempt started by [`Effect::Start`].
    pub fn complete(&mut self, id: AttemptId, outcome: ValidationOutcome<Accepted>) -> Effect {
        if self.disposed || self.pending != Pending::Attempt(id) {
            tracing::debug!(attempt = id.0, "discarding result of a stale attempt");
            return Effect::Ignored;
        }
        let trigger = Trigger::Resolved {
            accepted: outcome.is_ok(),
        };
        let Some(next) = transition(self.state, trigger, &self.context()) else {
            return Effect::Ignored;
        };
        self.pending = Pending::None;

        match outcome {
            Ok(accepted) => {
                // Only in-memory contents get a handle; no disk I/O here.
                let handle = match accepted.file.is_loaded().then(|| accepted.file.read()) {
                    Some(Ok(bytes)) => Some(self.registry.acquire(bytes)),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "no display handle for preview");
                        None
                    }
                    None => {
                        tracing::warn!("preview file is not loaded, showing payload only");
                        None
                    }
                };
                let previous = self.preview.replace(Preview {
                    payload: accepted.preview,
                    handle,
                });
                drop(previous);
                self.enter(next);
                if let Some(preview) = &self.preview {
                    (self.on_select)(Some(&accepted.file), Some(&preview.payload));
                }
            }
            Err(e) => {
                tracing::info!(attempt = id.0, reason = e.code(), "upload attempt failed");
                self.error = Some(e.to_string());
                self.enter(next);
            }
        }
        Effect::Changed
    }

    /// Run `attempt` through `pipeline` and apply the result.
    pub async fn run<B: ImageBackend + 'static>(
        &mut self,
        pipeline: &UploadPipeline<B>,
        attempt: Attempt,
    ) -> Effect {
        let outcome = pipeline.run(attempt.file).await;
        self.complete(attempt.id, outcome)
    }

    /// Back to `Idle`: preview released, error cleared, any running attempt
    /// invalidated. The callback is not invoked.
    pub fn reset(&mut self) {
        self.preview = None;
        self.error = None;
        self.pending = Pending::None;
        self.resting = InteractionState::Idle;
        self.state = InteractionState::Idle;
    }

    /// Tear down: release everything and ignore all later input.
    pub fn dispose(&mut self) {
        self.reset();
        self.disposed = true;
    }
}

impl std::fmt::Debug for UploadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadController")
            .field("state", &self.state)
            .field("error", &self.error)
            .field("preview", &self.preview)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}
