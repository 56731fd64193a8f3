use chrono::{DateTime, Utc};

/// Format a phone number for display
/// Normalizes Ethiopian numbers to +251 9XX XXX XXX
pub fn format_phone(phone: &str) -> String {
    // Extract just the digits
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        // Local form: 0911234567
        10 if digits.starts_with('0') => format!(
            "+251 {} {} {}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..10]
        ),
        // International form: 251911234567
        12 if digits.starts_with("251") => format!(
            "+251 {} {} {}",
            &digits[3..6],
            &digits[6..9],
            &digits[9..12]
        ),
        _ => phone.to_string(), // Return original if can't format
    }
}

/// Format a price in birr with thousands separators
pub fn format_price(birr: u64) -> String {
    let digits = birr.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{} ETB", out)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as a short readable date
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Human "time ago" for an age in minutes
pub fn format_age_minutes(minutes: i64) -> String {
    if minutes < 1 {
        // Negative ages come from clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            // Round up: 1d 12h+ becomes 2d
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}
