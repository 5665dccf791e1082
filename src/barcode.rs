// src/barcode.rs
use chrono::{DateTime, Utc};

/// Clean up text delivered by a keyboard-wedge scanner.
pub fn normalize(raw: &str) -> String {
    // 1) remove leading/trailing whitespace & control chars (CR/LF/TAB, BOM)
    let s = raw.trim_matches(|c: char| c.is_whitespace() || c.is_control() || c == '\u{FEFF}');

    // 2) Code39 and Code128 can carry letters, so only control chars are dropped
    //    from the middle (some scanners inject a GS separator).
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if !ch.is_control() && ch != '\u{FEFF}' {
            out.push(ch);
        }
    }
    out
}

/// Manual entry only has to be non-empty after trimming.
pub fn validate_manual(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Drops a repeat of the same code that arrives too soon after the last
/// accepted one. Wedge scanners often fire twice on a single trigger.
#[derive(Debug)]
pub struct ScanDebouncer {
    window: chrono::Duration,
    last: Option<(DateTime<Utc>, String)>,
}

impl ScanDebouncer {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero()),
            last: None,
        }
    }

    pub fn accept(&mut self, barcode: &str, now: DateTime<Utc>) -> bool {
        if let Some((last_time, last_barcode)) = &self.last
            && now.signed_duration_since(*last_time) < self.window
            && last_barcode == barcode
        {
            tracing::debug!(barcode, "scan ignored - too soon after last scan and same barcode");
            return false;
        }
        self.last = Some((now, barcode.to_string()));
        true
    }
}
