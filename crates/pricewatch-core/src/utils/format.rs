use chrono::{DateTime, Local, Utc};

/// Longest URL shown in product listings
pub const MAX_URL_DISPLAY_LEN: usize = 80;

/// Truncate a string to `max_len` characters, appending "..." when cut
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}

/// Format a price in rupees, dropping the fraction for whole amounts
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("₹{:.0}", price)
    } else {
        format!("₹{:.2}", price)
    }
}

/// Format a timestamp in local time
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
}
