use chrono::{DateTime, Local};

/// Human-readable size in binary units
pub fn format_bytes(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Render an RFC 3339 timestamp in local time, e.g. `May 1, 2024, 09:30 AM`.
///
/// Strings that do not parse are shown unchanged.
pub fn format_date(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => date
            .with_timezone(&Local)
            .format("%B %-d, %Y, %I:%M %p")
            .to_string(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert!(format_bytes(0).ends_with(" B"));
        assert!(format_bytes(1024).ends_with("KiB"));
        assert!(format_bytes(1536 * 1024).starts_with("1.5"));
        assert!(format_bytes(1536 * 1024).ends_with("MiB"));
    }

    #[test]
    fn test_format_date_passthrough() {
        assert_eq!(format_date("not a date"), "not a date");
    }

    #[test]
    fn test_format_date_contains_year() {
        let formatted = format_date("2024-06-15T12:00:00Z");
        assert!(formatted.contains("2024"), "{formatted}");
        assert!(formatted.starts_with("June"), "{formatted}");
    }
}
