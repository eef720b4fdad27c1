/// Format an amount in rupiah the way the services display it: "Rp.250.000"
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp.{}", grouped)
    } else {
        format!("Rp.{}", grouped)
    }
}

/// Parse a rupiah display string ("Rp.100.000", "Rp 100,000", "100000") back
/// into an amount. Returns None when no digits remain.
pub fn parse_rupiah(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .trim_start_matches("Rp")
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' '))
        .collect();
    digits.parse().ok()
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

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%d %b %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        // "2024-05-05 10:00:00 +0700 WIB" and similar
        date[..10].to_string()
    } else {
        date.to_string()
    }
}
