//! Polling dashboard controller and on-demand section jobs.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use shared::{
    domain::Section,
    error::{ErrorSignal, MissingField},
};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    pipeline::{FetchPipeline, Outcome},
    render::{Content, Region, RenderTarget},
    transport::RequestDescriptor,
};

pub const FAILURE_PLACEHOLDER: &str = "Error";
pub const MISSING_PLACEHOLDER: &str = "N/A";

/// Fallback content written when a job cannot render its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    /// Written on transport, read, parse and (by default) application failures.
    pub failure: String,
    /// Written when the payload parsed but lacks a field the formatter needs.
    pub missing: String,
    /// When set, application errors render as `{prefix}{message}` instead of
    /// the failure placeholder.
    pub application_error_prefix: Option<String>,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            failure: FAILURE_PLACEHOLDER.to_string(),
            missing: MISSING_PLACEHOLDER.to_string(),
            application_error_prefix: None,
        }
    }
}

impl Placeholders {
    /// Same text for every failure kind.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            failure: text.clone(),
            missing: text,
            application_error_prefix: None,
        }
    }

    pub fn with_application_errors(mut self, prefix: impl Into<String>) -> Self {
        self.application_error_prefix = Some(prefix.into());
        self
    }
}

/// Maps one outcome to the content its region should show.
pub fn render_outcome<T, F>(outcome: Outcome<T>, formatter: F, placeholders: &Placeholders) -> Content
where
    F: FnOnce(&T) -> Result<Content, MissingField>,
{
    match outcome {
        Outcome::Success(value) => match formatter(&value) {
            Ok(content) => content,
            Err(missing) => {
                debug!(field = missing.field, "payload lacks expected field");
                Content::text(&placeholders.missing)
            }
        },
        Outcome::ApplicationError(message) => match &placeholders.application_error_prefix {
            Some(prefix) => Content::text(format!("{prefix}{message}")),
            None => Content::text(&placeholders.failure),
        },
        Outcome::NetworkFailure(_) | Outcome::BodyReadFailure(_) | Outcome::ParseFailure(_) => {
            Content::text(&placeholders.failure)
        }
    }
}

#[async_trait]
trait Refresh: Send + Sync {
    async fn refresh(&self, pipeline: &FetchPipeline);
}

type Formatter<T> = dyn Fn(&T) -> Result<Content, MissingField> + Send + Sync;

struct TypedJob<T> {
    endpoint: String,
    target: Arc<dyn RenderTarget>,
    formatter: Box<Formatter<T>>,
    placeholders: Placeholders,
}

#[async_trait]
impl<T> Refresh for TypedJob<T>
where
    T: DeserializeOwned + ErrorSignal + Send + Sync + 'static,
{
    async fn refresh(&self, pipeline: &FetchPipeline) {
        let outcome = pipeline
            .execute::<T>(RequestDescriptor::get(&self.endpoint))
            .await;
        let content = render_outcome(outcome, |value| (self.formatter)(value), &self.placeholders);
        self.target.render(content);
    }
}

/// One (endpoint, render target, formatter) triple.
#[derive(Clone)]
pub struct Job {
    inner: Arc<dyn Refresh>,
}

impl Job {
    pub fn new<T, F>(endpoint: impl Into<String>, target: Arc<dyn RenderTarget>, formatter: F) -> Self
    where
        T: DeserializeOwned + ErrorSignal + Send + Sync + 'static,
        F: Fn(&T) -> Result<Content, MissingField> + Send + Sync + 'static,
    {
        Self::with_placeholders(endpoint, target, Placeholders::default(), formatter)
    }

    pub fn with_placeholders<T, F>(
        endpoint: impl Into<String>,
        target: Arc<dyn RenderTarget>,
        placeholders: Placeholders,
        formatter: F,
    ) -> Self
    where
        T: DeserializeOwned + ErrorSignal + Send + Sync + 'static,
        F: Fn(&T) -> Result<Content, MissingField> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TypedJob {
                endpoint: endpoint.into(),
                target,
                formatter: Box::new(formatter),
                placeholders,
            }),
        }
    }

    /// Fetches, formats and writes. Always ends in exactly one write.
    pub async fn refresh(&self, pipeline: &FetchPipeline) {
        self.inner.refresh(pipeline).await;
    }
}

/// Ordered set of jobs sharing one pipeline.
#[derive(Clone)]
pub struct Dashboard {
    pipeline: FetchPipeline,
    jobs: Arc<Vec<Job>>,
}

impl Dashboard {
    pub fn new(pipeline: FetchPipeline, jobs: Vec<Job>) -> Self {
        Self {
            pipeline,
            jobs: Arc::new(jobs),
        }
    }

    /// Runs every job concurrently. A failing job only affects its own region.
    pub async fn run_once(&self) {
        join_all(self.jobs.iter().map(|job| job.refresh(&self.pipeline))).await;
    }

    /// Runs immediately, then every `period`. Each tick is spawned on its own,
    /// so a slow tick never delays the next one.
    pub fn start(&self, period: Duration) -> PollHandle {
        let period = period.max(Duration::from_millis(1));
        let (completed_tx, completed_rx) = watch::channel(0_u64);
        let completed_tx = Arc::new(completed_tx);
        let dashboard = self.clone();

        info!(
            jobs = self.jobs.len(),
            period_ms = period.as_millis() as u64,
            "starting dashboard polling"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick = 0_u64;
            loop {
                ticker.tick().await;
                tick += 1;
                debug!(tick, "dashboard tick");

                let dashboard = dashboard.clone();
                let completed_tx = Arc::clone(&completed_tx);
                tokio::spawn(async move {
                    dashboard.run_once().await;
                    completed_tx.send_modify(|completed| *completed += 1);
                });
            }
        });

        PollHandle {
            task,
            completed: completed_rx,
        }
    }
}

/// Handle to a running poll schedule. Dropping it stops the schedule.
pub struct PollHandle {
    task: JoinHandle<()>,
    completed: watch::Receiver<u64>,
}

impl PollHandle {
    /// Number of ticks whose jobs have all finished.
    pub fn completed_ticks(&self) -> u64 {
        *self.completed.borrow()
    }

    /// Waits until at least `ticks` ticks have finished.
    pub async fn wait_for_ticks(&mut self, ticks: u64) {
        if self
            .completed
            .wait_for(|completed| *completed >= ticks)
            .await
            .is_err()
        {
            warn!("dashboard polling stopped before reaching {ticks} ticks");
        }
    }

    /// Stops scheduling new ticks. Fetches already issued still complete.
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Jobs that run when their section becomes visible rather than on a timer.
pub struct SectionJobs {
    panels: Vec<(Section, Arc<Region>)>,
    sections: HashMap<Section, Dashboard>,
}

impl SectionJobs {
    pub fn new(panels: Vec<(Section, Arc<Region>)>) -> Self {
        Self {
            panels,
            sections: HashMap::new(),
        }
    }

    pub fn with_section(mut self, section: Section, dashboard: Dashboard) -> Self {
        self.sections.insert(section, dashboard);
        self
    }

    /// Shows `section`, hides the others and runs the section's jobs once.
    pub async fn show(&self, section: Section) {
        for (panel_section, panel) in &self.panels {
            panel.set_visible(*panel_section == section);
        }
        debug!(section = %section, "section shown");

        if let Some(dashboard) = self.sections.get(&section) {
            dashboard.run_once().await;
        }
    }

    pub fn visible(&self) -> Option<Section> {
        self.panels
            .iter()
            .find(|(_, panel)| panel.is_visible())
            .map(|(section, _)| *section)
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
