/// Human-readable byte size, binary units.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Whole-unit price with thousands separators: 1234567.8 -> "1,234,568".
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return "-".to_string();
    }

    let rounded = price.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Signed percentage with one decimal: "-12.5%", "+3.0%".
pub fn format_percent(pct: f64) -> String {
    if !pct.is_finite() {
        return "-".to_string();
    }
    format!("{pct:+.1}%")
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn prices() {
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(1000.0), "1,000");
        assert_eq!(format_price(1_234_567.8), "1,234,568");
        assert_eq!(format_price(-200_000.0), "-200,000");
        assert_eq!(format_price(f64::NAN), "-");
    }

    #[test]
    fn percents() {
        assert_eq!(format_percent(-20.0), "-20.0%");
        assert_eq!(format_percent(3.04), "+3.0%");
        assert_eq!(format_percent(f64::INFINITY), "-");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("Downtown", 30), "Downtown");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("שכונה ארוכה מאוד", 8), "שכונה...");
    }
}
