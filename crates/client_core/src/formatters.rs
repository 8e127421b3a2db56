//! Pure payload formatters for the system-monitor metrics and portal sections.

use std::fmt::Write as _;

use shared::{
    error::{require, MissingField},
    protocol::{
        CpuResponse, DiskResponse, DocumentsResponse, EventRecord, EventsResponse,
        FinancesResponse, LoadResponse, MemResponse, UptimeResponse, UserProfile,
    },
};

use crate::render::{escape_markup, Content};

pub const DEFAULT_GREETING_NAME: &str = "Brother";
pub const NO_UPCOMING_EVENTS: &str = "No upcoming events.";
pub const EVENTS_UNAVAILABLE: &str = "Error loading events.";
pub const DOCUMENTS_UNAVAILABLE: &str = "Error loading documents.";

pub fn uptime(payload: &UptimeResponse) -> Result<Content, MissingField> {
    let seconds = require(&payload.uptime, "uptime")?;
    Ok(Content::text(format!("{seconds} seconds")))
}

pub fn load(payload: &LoadResponse) -> Result<Content, MissingField> {
    let load1 = require(&payload.load1, "load1")?;
    let load5 = require(&payload.load5, "load5")?;
    let load15 = require(&payload.load15, "load15")?;
    Ok(Content::text(format!("{load1}, {load5}, {load15}")))
}

pub fn mem(payload: &MemResponse) -> Result<Content, MissingField> {
    let total = require(&payload.mem_total, "mem_total")?;
    let free = require(&payload.mem_free, "mem_free")?;
    Ok(Content::text(format!("Total: {total} kB, Free: {free} kB")))
}

pub fn cpu(payload: &CpuResponse) -> Result<Content, MissingField> {
    let stats = require(&payload.cpu_stats, "cpu_stats")?;
    if stats.is_empty() {
        return Err(MissingField::new("cpu_stats"));
    }
    Ok(Content::text(stats.clone()))
}

pub fn disk(payload: &DiskResponse) -> Result<Content, MissingField> {
    let total = require(&payload.disk_total, "disk_total")?;
    let free = require(&payload.disk_free, "disk_free")?;
    Ok(Content::text(format!("Total: {total} kB, Free: {free} kB")))
}

/// First name for the welcome banner, with a fallback for unnamed members.
pub fn greeting(payload: &UserProfile) -> Result<Content, MissingField> {
    let name = payload
        .first_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_GREETING_NAME);
    Ok(Content::text(name))
}

/// Short `M/D/YYYY` date, or the raw timestamp when it cannot be parsed.
pub fn event_date(event: &EventRecord) -> String {
    match event.start_date() {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => event.start.clone(),
    }
}

pub fn next_event(payload: &EventsResponse) -> Result<Content, MissingField> {
    let events = require(&payload.events, "events")?;
    Ok(match events.first() {
        Some(event) => Content::text(format!("{} on {}", event.title, event_date(event))),
        None => Content::text(NO_UPCOMING_EVENTS),
    })
}

pub fn events_table(payload: &EventsResponse) -> Result<Content, MissingField> {
    let events = require(&payload.events, "events")?;
    let mut html = String::from("<table><tr><th>Date</th><th>Event</th><th>Location</th></tr>");
    for event in events {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_markup(&event_date(event)),
            escape_markup(&event.title),
            escape_markup(event.location.as_deref().unwrap_or_default()),
        );
    }
    html.push_str("</table>");
    Ok(Content::markup(html))
}

pub fn finances(payload: &FinancesResponse) -> Result<Content, MissingField> {
    let owed = require(&payload.dues_owed, "duesOwed")?;
    let paid = require(&payload.dues_paid, "duesPaid")?;
    let mut text = format!(
        "Dues Owed: ${owed}, Paid: ${paid}. Outstanding Balance: ${}",
        owed - paid
    );

    let fines = payload.fines.as_deref().unwrap_or_default();
    if !fines.is_empty() {
        text.push_str("\nFines:\n");
        for fine in fines {
            let _ = writeln!(
                text,
                " - ${} for {} ({})",
                fine.amount, fine.reason, fine.status
            );
        }
    }
    Ok(Content::text(text))
}

/// Document links; `link_base` is the URL each document id is appended to.
pub fn documents_list(payload: &DocumentsResponse, link_base: &str) -> Result<Content, MissingField> {
    let documents = require(&payload.documents, "documents")?;
    let base = link_base.trim_end_matches('/');
    let mut html = String::new();
    for document in documents {
        let _ = write!(
            html,
            "<li><a href=\"{}/{}\" target=\"_blank\">{}</a></li>",
            escape_markup(base),
            document.id,
            escape_markup(&document.title),
        );
    }
    Ok(Content::markup(html))
}
