//! Template renderer: substitutes the built-in placeholders per client.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

use billnudge_core::Client;

/// Days added to "now" for `{dueDate}` when no configuration is at hand.
pub const DEFAULT_DUE_IN_DAYS: i64 = 7;

/// Render `template` for `client`, with `{dueDate}` a week after `now`.
///
/// Recognized placeholders: `{name}`, `{amount}`, `{phone}`, `{dueDate}`.
/// Anything else in braces is left as written.
pub fn render(template: &str, client: &Client, now: DateTime<FixedOffset>) -> String {
    render_with_due_date(template, client, due_date_from(now, DEFAULT_DUE_IN_DAYS))
}

pub fn render_with_due_date(template: &str, client: &Client, due: NaiveDate) -> String {
    template
        .replace("{name}", &client.name)
        .replace("{amount}", &client.balance.to_string())
        .replace("{phone}", &client.phone)
        .replace("{dueDate}", &format_due_date(due))
}

/// The calendar day `days` after `now` on the business wall clock.
///
/// An offset chrono cannot represent falls back to [`DEFAULT_DUE_IN_DAYS`].
pub fn due_date_from(now: DateTime<FixedOffset>, days: i64) -> NaiveDate {
    let shifted = |d: i64| Duration::try_days(d).and_then(|delta| now.checked_add_signed(delta));
    match shifted(days) {
        Some(due) => due.date_naive(),
        None => {
            tracing::warn!("⚠️ due_in_days={days} is out of range, using {DEFAULT_DUE_IN_DAYS}");
            shifted(DEFAULT_DUE_IN_DAYS).unwrap_or(now).date_naive()
        }
    }
}

/// `15 Oct 2026` style, as the dashboard shows dates.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}
