use std::sync::LazyLock;

use regex::Regex;

pub const STATUS_MARKER: &str = "| Status: ";
pub const STATUS_UP: &str = "Up";

// prefix, bot-owned segment (up to the next pipe), operator-owned suffix
static STATUS_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)\| Status: ([^|]*)(.*)$").expect("status segment pattern is valid")
});

/// Joins incident summaries into the status segment text.
pub fn render_status(summaries: &[String]) -> String {
    if summaries.is_empty() {
        return STATUS_UP.to_string();
    }
    summaries.join(" / ")
}

/// Computes the topic carrying `status`, or `None` when `current` already
/// shows it. Text outside the status segment is kept byte-for-byte.
pub fn rewrite_topic(current: &str, status: &str) -> Option<String> {
    let Some(caps) = STATUS_SEGMENT.captures(current) else {
        if current.is_empty() {
            return Some(format!("{STATUS_MARKER}{status}"));
        }
        return Some(format!("{current} {STATUS_MARKER}{status}"));
    };

    let prefix = caps.get(1).map_or("", |m| m.as_str());
    let segment = caps.get(2).map_or("", |m| m.as_str());
    let suffix = caps.get(3).map_or("", |m| m.as_str());
    if segment.trim_end() == status {
        return None;
    }
    if suffix.is_empty() {
        Some(format!("{prefix}{STATUS_MARKER}{status}"))
    } else {
        Some(format!("{prefix}{STATUS_MARKER}{status} {suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_the_status_segment() {
        let topic = "Deploys ok | Status: Up | Please be nice";
        assert_eq!(
            rewrite_topic(topic, "Website down (#4)").as_deref(),
            Some("Deploys ok | Status: Website down (#4) | Please be nice")
        );
    }

    #[test]
    fn appends_segment_when_missing() {
        assert_eq!(
            rewrite_topic("Deploys ok", "Up").as_deref(),
            Some("Deploys ok | Status: Up")
        );
        assert_eq!(rewrite_topic("", "Up").as_deref(), Some("| Status: Up"));
    }

    #[test]
    fn unchanged_status_needs_no_write() {
        assert_eq!(rewrite_topic("Deploys ok | Status: Up | Be nice", "Up"), None);
        assert_eq!(rewrite_topic("Deploys ok | Status: Up", "Up"), None);

        let first = rewrite_topic("Deploys ok", "Website degraded (#1)").unwrap();
        assert_eq!(rewrite_topic(&first, "Website degraded (#1)"), None);
    }

    #[test]
    fn trailing_segment_is_rewritten_without_padding() {
        assert_eq!(
            rewrite_topic("Ops | Status: Website down (#4)", "Up").as_deref(),
            Some("Ops | Status: Up")
        );
    }

    #[test]
    fn operator_text_with_pipes_survives() {
        let topic = "a | b | Status: Up |c|d";
        assert_eq!(
            rewrite_topic(topic, "Thumbnails degraded (#2)").as_deref(),
            Some("a | b | Status: Thumbnails degraded (#2) |c|d")
        );
    }

    #[test]
    fn status_joins_summaries() {
        assert_eq!(render_status(&[]), "Up");
        assert_eq!(
            render_status(&["A down (#1)".to_string(), "B degraded (#2)".to_string()]),
            "A down (#1) / B degraded (#2)"
        );
    }
}
