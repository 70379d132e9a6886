use std::time::{SystemTime, UNIX_EPOCH};

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Current unix time in milliseconds, per the local clock.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_adds_scheme_once() {
        assert_eq!(normalize_url("chat.example.com"), "https://chat.example.com");
        assert_eq!(normalize_url(" http://local:3000 "), "http://local:3000");
    }
}
