//! HTML mail bodies for reservation notifications.

use chrono::{DateTime, Utc};

const DATE_FORMAT: &str = "%B %d, %Y %I:%M %p";

/// Which lifecycle step a mail announces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Submitted,
    Approved,
    Disapproved,
    Cancelled,
}

impl NotificationKind {
    fn headline(&self) -> &'static str {
        match self {
            NotificationKind::Submitted => "A venue reservation request is awaiting your approval.",
            NotificationKind::Approved => "Your venue reservation request has been approved.",
            NotificationKind::Disapproved => "Your venue reservation request has been disapproved.",
            NotificationKind::Cancelled => "A venue reservation request has been cancelled.",
        }
    }

    fn subject_prefix(&self) -> &'static str {
        match self {
            NotificationKind::Submitted => "For Approval",
            NotificationKind::Approved => "Approved",
            NotificationKind::Disapproved => "Disapproved",
            NotificationKind::Cancelled => "Cancelled",
        }
    }
}

/// Everything a template may print
#[derive(Debug, Clone)]
pub struct ReservationEmailContext {
    pub reference_number: String,
    pub title: String,
    pub venue_name: String,
    pub requester_name: String,
    pub requester_email: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub status: String,
    pub reason: Option<String>,
    pub decided_by: Option<String>,
}

pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn render_subject(kind: NotificationKind, ctx: &ReservationEmailContext) -> String {
    format!(
        "[{}] Venue Reservation {} - {}",
        kind.subject_prefix(),
        ctx.reference_number,
        ctx.title
    )
}

pub fn render_body(kind: NotificationKind, ctx: &ReservationEmailContext) -> String {
    let mut rows = vec![
        ("Reference Number", ctx.reference_number.clone()),
        ("Event", ctx.title.clone()),
        ("Venue", ctx.venue_name.clone()),
        (
            "Schedule",
            format!("{} to {}", format_date(&ctx.from), format_date(&ctx.to)),
        ),
        (
            "Requested By",
            format!("{} <{}>", ctx.requester_name, ctx.requester_email),
        ),
        ("Status", ctx.status.clone()),
    ];

    if let Some(actor) = ctx.decided_by.as_deref() {
        rows.push(("Acted On By", actor.to_string()));
    }
    if matches!(
        kind,
        NotificationKind::Disapproved | NotificationKind::Cancelled
    ) {
        rows.push((
            "Reason",
            ctx.reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "No reason given".to_string()),
        ));
    }

    let table_rows: String = rows
        .into_iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"padding:4px 12px 4px 0\"><strong>{}</strong></td><td>{}</td></tr>",
                label,
                escape_html(&value)
            )
        })
        .collect();

    format!(
        "<html><body><p>{}</p><table>{}</table></body></html>",
        kind.headline(),
        table_rows
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
