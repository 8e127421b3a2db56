//! Client core for the member portal and the system monitor: a typed fetch
//! pipeline, the form submission controller built on it, and the polling
//! dashboard controller.

use std::sync::Arc;

use shared::domain::Section;

pub mod config;
pub mod dashboard;
pub mod form;
pub mod formatters;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod transport;
pub mod views;

pub use config::{load_settings, ClientSettings, Endpoints, SettingsError};
pub use dashboard::{Dashboard, Job, Placeholders, PollHandle, SectionJobs};
pub use form::{
    FieldSet, FieldSpec, FormController, FormSpec, HistoryNavigator, NavigationEvent, Navigator,
    Submission, SuccessAction,
};
pub use pipeline::{FetchPipeline, Outcome, OutcomeKind};
pub use render::{Content, Region, RenderTarget, Surface};
pub use transport::{
    Credentials, Method, ReqwestTransport, RequestBody, RequestDescriptor, Transport,
    TransportError, TransportResponse,
};

/// One client session: shared transport, render surface and navigator.
pub struct PortalClient {
    settings: ClientSettings,
    pipeline: FetchPipeline,
    surface: Arc<Surface>,
    navigator: Arc<dyn Navigator>,
}

impl PortalClient {
    pub fn new(settings: ClientSettings, navigator: Arc<dyn Navigator>) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&settings.base_url, settings.request_timeout())?;
        Ok(Self::with_transport(settings, Arc::new(transport), navigator))
    }

    pub fn with_transport(
        settings: ClientSettings,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            settings,
            pipeline: FetchPipeline::new(transport),
            surface: Arc::new(Surface::new()),
            navigator,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    pub fn login_form(&self) -> FormController {
        FormController::new(
            FormSpec::login(&self.settings.endpoints.login),
            self.pipeline.clone(),
            self.surface.region(views::regions::LOGIN_ERROR),
            Arc::clone(&self.navigator),
        )
    }

    pub fn signup_form(&self) -> FormController {
        FormController::new(
            FormSpec::signup(&self.settings.endpoints.signup),
            self.pipeline.clone(),
            self.surface.region(views::regions::SIGNUP_ERROR),
            Arc::clone(&self.navigator),
        )
    }

    pub async fn logout(&self) -> OutcomeKind {
        session::logout(
            &self.pipeline,
            &self.settings.endpoints.logout,
            self.navigator.as_ref(),
        )
        .await
    }

    pub fn system_monitor(&self) -> Dashboard {
        views::system_monitor(&self.surface, &self.pipeline, &self.settings)
    }

    pub fn portal_sections(&self) -> SectionJobs {
        views::portal_sections(&self.surface, &self.pipeline, &self.settings)
    }

    /// Content of the named regions, in the order given.
    pub fn regions_snapshot(&self, names: &[&str]) -> Vec<(String, Content)> {
        names
            .iter()
            .map(|name| (name.to_string(), self.surface.region(name).content()))
            .collect()
    }

    /// Loads the main view the way the page does on first display.
    pub async fn open_main_view(&self) -> SectionJobs {
        let sections = self.portal_sections();
        sections.show(Section::Dashboard).await;
        sections
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
