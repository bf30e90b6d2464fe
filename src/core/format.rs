//! Relative-time and toast text helpers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Utc};

/// Longest message a toast will display before truncation
pub const TOAST_TEXT_LIMIT: usize = 280;

/// Describe how far `target` is from `now`, coarsest unit only
///
/// Anything under a minute away (or already past) reads as "now".
pub fn format_time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (target - now).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{} from now", plural(days, "day"))
    } else if hours > 0 {
        format!("{} from now", plural(hours, "hour"))
    } else if minutes > 0 {
        format!("{} from now", plural(minutes, "minute"))
    } else {
        "now".to_string()
    }
}

/// Truncate text for toast display, adding ellipsis if needed
pub fn truncate_for_toast(text: &str) -> String {
    if text.len() <= TOAST_TEXT_LIMIT {
        text.to_string()
    } else {
        let mut end = TOAST_TEXT_LIMIT - 3;
        while !text.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

fn plural(count: i64, unit: &str) -> String {
    format!("{} {}{}", count, unit, if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_time_until() {
        let now = Utc::now();
        assert_eq!(format_time_until(now + Duration::days(2), now), "2 days from now");
        assert_eq!(format_time_until(now + Duration::minutes(90), now), "1 hour from now");
        assert_eq!(format_time_until(now + Duration::minutes(5), now), "5 minutes from now");
        assert_eq!(format_time_until(now + Duration::seconds(30), now), "now");
        assert_eq!(format_time_until(now - Duration::hours(1), now), "now");
    }

    #[test]
    fn test_truncate_for_toast() {
        assert_eq!(truncate_for_toast("short"), "short");

        let long = "日本語".repeat(100);
        let truncated = truncate_for_toast(&long);
        assert!(truncated.len() <= TOAST_TEXT_LIMIT);
        assert!(truncated.ends_with("..."));
    }
}
