// Store status display for the `stats` subcommand.

use colored::Colorize;

use crate::store::StoreStats;

/// Print one store's read-only stats line.
pub fn show(label: &str, stats: &StoreStats) {
    if !stats.path.exists() {
        println!(
            "{}: not initialized ({})",
            label.bold(),
            stats.path.display()
        );
        return;
    }

    let file_size = std::fs::metadata(&stats.path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!(
        "{}: {} entries, ttl {} days ({}, {})",
        label.bold(),
        stats.count,
        stats.ttl_days,
        stats.path.display(),
        file_size
    );
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
