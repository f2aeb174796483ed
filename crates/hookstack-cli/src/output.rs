//! Formatted output helpers for CLI commands.

/// Returns a horizontal rule `width` characters wide.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}

/// Formats a memory size in MB (e.g., "256 MB", "1.5 GB").
#[must_use]
pub fn format_memory(memory_mb: u32) -> String {
    const GB: u32 = 1024;

    if memory_mb >= GB {
        format!("{:.1} GB", f64::from(memory_mb) / f64::from(GB))
    } else {
        format!("{memory_mb} MB")
    }
}
