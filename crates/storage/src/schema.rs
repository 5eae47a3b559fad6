/// Storage format written by this version of the store.
///
/// Version 0 marks an install whose records predate versioning; those records
/// are rewritten once on load.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub const SCHEMA_VERSION_FILE: &str = "_schemaVersion";

/// Unreadable content counts as version 0.
pub fn parse_schema_version(text: &str) -> u32 {
    text.lines()
        .next()
        .and_then(|line| line.trim().parse().ok())
        .unwrap_or(0)
}

pub fn needs_migration(stored: u32) -> bool {
    stored < CURRENT_SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_line() {
        assert_eq!(parse_schema_version("3\n"), 3);
        assert_eq!(parse_schema_version(" 1 "), 1);
    }

    #[test]
    fn garbage_reads_as_zero() {
        assert_eq!(parse_schema_version(""), 0);
        assert_eq!(parse_schema_version("v2"), 0);
        assert_eq!(parse_schema_version("-1"), 0);
    }

    #[test]
    fn migration_gate() {
        assert!(needs_migration(0));
        assert!(!needs_migration(CURRENT_SCHEMA_VERSION));
    }
}
