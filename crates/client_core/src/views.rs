//! Job catalogues wiring endpoints to the regions of each page.

use std::sync::Arc;

use shared::{
    domain::Section,
    protocol::{
        CpuResponse, DiskResponse, DocumentsResponse, EventsResponse, FinancesResponse,
        LoadResponse, MemResponse, UptimeResponse, UserProfile,
    },
};

use crate::{
    config::ClientSettings,
    dashboard::{Dashboard, Job, Placeholders, SectionJobs},
    formatters,
    pipeline::FetchPipeline,
    render::Surface,
};

/// Region names shared with the page markup.
pub mod regions {
    pub const LOGIN_ERROR: &str = "loginError";
    pub const SIGNUP_ERROR: &str = "signupError";

    pub const UPTIME: &str = "uptime";
    pub const LOAD: &str = "load";
    pub const MEM: &str = "mem";
    pub const CPU: &str = "cpu";
    pub const DISK: &str = "disk";

    pub const WELCOME_NAME: &str = "welcomeName";
    pub const NEXT_EVENT: &str = "nextEvent";
    pub const EVENTS_LIST: &str = "eventsList";
    pub const FINANCE_STATUS: &str = "financeStatus";
    pub const DOCUMENT_LIST: &str = "docList";
}

/// Metric regions in display order.
pub const MONITOR_REGIONS: [&str; 5] = [
    regions::UPTIME,
    regions::LOAD,
    regions::MEM,
    regions::CPU,
    regions::DISK,
];

/// Content regions that live inside a section's panel.
pub fn section_regions(section: Section) -> &'static [&'static str] {
    match section {
        Section::Dashboard => &[regions::WELCOME_NAME, regions::NEXT_EVENT],
        Section::Events => &[regions::EVENTS_LIST],
        Section::Finances => &[regions::FINANCE_STATUS],
        Section::Documents => &[regions::DOCUMENT_LIST],
    }
}

pub fn system_monitor_jobs(surface: &Surface, settings: &ClientSettings) -> Vec<Job> {
    let endpoints = &settings.endpoints;
    vec![
        Job::new::<UptimeResponse, _>(
            &endpoints.uptime,
            surface.region(regions::UPTIME),
            formatters::uptime,
        ),
        Job::new::<LoadResponse, _>(
            &endpoints.load,
            surface.region(regions::LOAD),
            formatters::load,
        ),
        Job::new::<MemResponse, _>(&endpoints.mem, surface.region(regions::MEM), formatters::mem),
        Job::new::<CpuResponse, _>(&endpoints.cpu, surface.region(regions::CPU), formatters::cpu),
        Job::new::<DiskResponse, _>(
            &endpoints.disk,
            surface.region(regions::DISK),
            formatters::disk,
        ),
    ]
}

pub fn system_monitor(
    surface: &Surface,
    pipeline: &FetchPipeline,
    settings: &ClientSettings,
) -> Dashboard {
    Dashboard::new(pipeline.clone(), system_monitor_jobs(surface, settings))
}

/// Portal sections; panels are named after the section they hold.
pub fn portal_sections(
    surface: &Surface,
    pipeline: &FetchPipeline,
    settings: &ClientSettings,
) -> SectionJobs {
    let endpoints = &settings.endpoints;
    let panels = Section::ALL
        .iter()
        .map(|section| (*section, surface.region(section.as_str())))
        .collect();

    let dashboard = Dashboard::new(
        pipeline.clone(),
        vec![
            Job::new::<UserProfile, _>(
                &endpoints.user_profile,
                surface.region(regions::WELCOME_NAME),
                formatters::greeting,
            ),
            Job::new::<EventsResponse, _>(
                endpoints.events_preview(settings.events_preview_limit),
                surface.region(regions::NEXT_EVENT),
                formatters::next_event,
            ),
        ],
    );

    let events = Dashboard::new(
        pipeline.clone(),
        vec![Job::with_placeholders::<EventsResponse, _>(
            &endpoints.events,
            surface.region(regions::EVENTS_LIST),
            Placeholders::uniform(formatters::EVENTS_UNAVAILABLE),
            formatters::events_table,
        )],
    );

    let finances = Dashboard::new(
        pipeline.clone(),
        vec![Job::with_placeholders::<FinancesResponse, _>(
            &endpoints.finances,
            surface.region(regions::FINANCE_STATUS),
            Placeholders::default().with_application_errors("Error: "),
            formatters::finances,
        )],
    );

    let link_base = settings.document_link_base();
    let documents = Dashboard::new(
        pipeline.clone(),
        vec![Job::with_placeholders::<DocumentsResponse, _>(
            &endpoints.documents,
            surface.region(regions::DOCUMENT_LIST),
            Placeholders::uniform(formatters::DOCUMENTS_UNAVAILABLE),
            move |payload: &DocumentsResponse| formatters::documents_list(payload, &link_base),
        )],
    );

    SectionJobs::new(panels)
        .with_section(Section::Dashboard, dashboard)
        .with_section(Section::Events, events)
        .with_section(Section::Finances, finances)
        .with_section(Section::Documents, documents)
}
