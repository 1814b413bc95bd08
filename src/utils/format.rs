//! Formatting helpers for status and progress text.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count the way progress lines show it: `512 B`, `1.50 KB`, `39.06 KB`.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_have_no_decimals() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
    }

    #[test]
    fn test_larger_units_use_two_decimals() {
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(40_000), "39.06 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_units_stop_at_terabytes() {
        let huge = 2048 * 1024 * 1024 * 1024 * 1024_u64;
        assert_eq!(format_file_size(huge), "2048.00 TB");
    }
}
