//! Form submission controller for the login and signup flows.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use shared::{domain::View, protocol::AuthResponse};
use tracing::{debug, info};

use crate::{
    pipeline::{FetchPipeline, Outcome, OutcomeKind},
    render::{Content, RenderTarget},
    transport::{Credentials, RequestDescriptor},
};

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields.";
pub const NETWORK_ERROR: &str = "Network error. Please try again.";
pub const READ_ERROR: &str = "Failed to read response.";
pub const SIGNUP_CONFIRMATION: &str = "Signup successful! Redirecting to login...";

pub fn invalid_response_message(raw: &str) -> String {
    format!("Invalid server response: {raw}")
}

/// Page-level side effects a successful submission can trigger.
pub trait Navigator: Send + Sync {
    fn navigate(&self, view: View);
    /// Blocking confirmation shown to the user before a follow-up navigation.
    fn confirm(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Confirmed(String),
    Navigated(View),
}

/// Navigator that records every side effect in order.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    events: Mutex<Vec<NavigationEvent>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn visited(&self) -> Vec<View> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                NavigationEvent::Navigated(view) => Some(view),
                NavigationEvent::Confirmed(_) => None,
            })
            .collect()
    }

    pub fn current(&self) -> Option<View> {
        self.visited().last().copied()
    }

    fn push(&self, event: NavigationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, view: View) {
        info!(view = %view, "navigating");
        self.push(NavigationEvent::Navigated(view));
    }

    fn confirm(&self, message: &str) {
        self.push(NavigationEvent::Confirmed(message.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Never trimmed; only checked for non-empty length.
    Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            required: true,
        }
    }

    pub fn secret(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Secret,
            required: true,
        }
    }

    pub fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        match self.kind {
            FieldKind::Text => raw.trim(),
            FieldKind::Secret => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessAction {
    Navigate(View),
    ConfirmThenNavigate { message: String, view: View },
}

/// Static description of one form: where it posts and what it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSpec {
    pub endpoint: String,
    pub fields: Vec<FieldSpec>,
    pub credentials: Credentials,
    pub on_success: SuccessAction,
}

impl FormSpec {
    pub fn login(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fields: vec![FieldSpec::text("username"), FieldSpec::secret("password")],
            credentials: Credentials::Include,
            on_success: SuccessAction::Navigate(View::Main),
        }
    }

    pub fn signup(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fields: vec![
                FieldSpec::text("username"),
                FieldSpec::secret("password"),
                FieldSpec::text("code"),
            ],
            credentials: Credentials::Omit,
            on_success: SuccessAction::ConfirmThenNavigate {
                message: SIGNUP_CONFIRMATION.to_string(),
                view: View::Login,
            },
        }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

/// Ordered field name to value mapping for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, keeping its original position when already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values for the form's declared fields, trimmed per field kind, in
    /// declaration order. Undeclared inputs are dropped.
    pub fn normalized(&self, spec: &FormSpec) -> FieldSet {
        let entries = spec
            .fields
            .iter()
            .map(|field| {
                let raw = self.get(&field.name).unwrap_or_default();
                (field.name.clone(), field.normalize(raw).to_string())
            })
            .collect();
        FieldSet { entries }
    }

    /// First required field whose normalized value is empty.
    pub fn first_missing<'a>(&self, spec: &'a FormSpec) -> Option<&'a FieldSpec> {
        spec.required_fields().find(|field| {
            self.get(&field.name)
                .map(|value| field.normalize(value).is_empty())
                .unwrap_or(true)
        })
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.entries
    }
}

/// What a call to [`FormController::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Another submission of this form was still running.
    Busy,
    /// A required field was empty; nothing was sent.
    Incomplete,
    Failed(OutcomeKind),
    Succeeded(View),
}

pub struct FormController {
    spec: FormSpec,
    pipeline: FetchPipeline,
    error_region: Arc<dyn RenderTarget>,
    navigator: Arc<dyn Navigator>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FormController {
    pub fn new(
        spec: FormSpec,
        pipeline: FetchPipeline,
        error_region: Arc<dyn RenderTarget>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            spec,
            pipeline,
            error_region,
            navigator,
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn submit(&self, input: &FieldSet) -> Submission {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!(form = %self.spec.endpoint, "submission ignored while another is in flight");
            return Submission::Busy;
        }
        let _guard = InFlight(&self.in_flight);

        self.error_region.render(Content::empty());

        let fields = input.normalized(&self.spec);
        debug!(
            form = %self.spec.endpoint,
            fields = ?fields.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            secret_lengths = ?self.secret_lengths(&fields),
            "submitting form"
        );

        if let Some(missing) = fields.first_missing(&self.spec) {
            debug!(form = %self.spec.endpoint, field = %missing.name, "required field is empty");
            self.error_region.render(Content::text(FILL_ALL_FIELDS));
            return Submission::Incomplete;
        }

        let descriptor = RequestDescriptor::post_form(&self.spec.endpoint, fields.into_pairs())
            .with_credentials(self.spec.credentials);
        let outcome = self.pipeline.execute::<AuthResponse>(descriptor).await;
        let kind = outcome.kind();

        let message = match outcome {
            Outcome::NetworkFailure(_) => NETWORK_ERROR.to_string(),
            Outcome::BodyReadFailure(_) => READ_ERROR.to_string(),
            Outcome::ParseFailure(raw) => invalid_response_message(&raw),
            Outcome::ApplicationError(message) => message,
            Outcome::Success(_) => return self.succeed(),
        };
        self.error_region.render(Content::text(message));
        Submission::Failed(kind)
    }

    fn succeed(&self) -> Submission {
        let view = match &self.spec.on_success {
            SuccessAction::Navigate(view) => *view,
            SuccessAction::ConfirmThenNavigate { message, view } => {
                self.navigator.confirm(message);
                *view
            }
        };
        info!(form = %self.spec.endpoint, view = %view, "form submission succeeded");
        self.navigator.navigate(view);
        Submission::Succeeded(view)
    }

    fn secret_lengths(&self, fields: &FieldSet) -> Vec<(String, usize)> {
        self.spec
            .fields
            .iter()
            .filter(|field| field.kind == FieldKind::Secret)
            .map(|field| {
                let len = fields.get(&field.name).map(str::len).unwrap_or_default();
                (field.name.clone(), len)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
