//! Value normalisation helpers

use chrono::NaiveDate;

/// Normalise a model name to lowercase-with-hyphens
///
/// Whitespace and underscores become hyphens, runs of hyphens collapse,
/// and leading or trailing hyphens are dropped. Dots are kept so version
/// numbers survive.
///
/// # Examples
///
/// ```
/// use modelcat_gatekeeper::normalize_model_name;
///
/// assert_eq!(normalize_model_name("GPT 4"), "gpt-4");
/// assert_eq!(normalize_model_name("Claude 3.5 Sonnet"), "claude-3.5-sonnet");
/// assert_eq!(normalize_model_name("  llama_3 -- 70b "), "llama-3-70b");
/// ```
pub fn normalize_model_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        } else {
            out.extend(c.to_lowercase());
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Parse an ISO date
///
/// Accepts `YYYY-MM-DD`, a `YYYY-MM` month (pinned to day 1), and a full
/// RFC 3339 timestamp (date part kept).
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use modelcat_gatekeeper::parse_date;
///
/// assert_eq!(parse_date("2023-03-14"), NaiveDate::from_ymd_opt(2023, 3, 14));
/// assert_eq!(parse_date("2023-03"), NaiveDate::from_ymd_opt(2023, 3, 1));
/// assert_eq!(parse_date("March 2023"), None);
/// ```
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if value.len() == 7 {
        return NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok();
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}
