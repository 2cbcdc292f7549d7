//! Guards against writing analysis output over a source catalog.

use anyhow::{bail, Result};
use std::path::Path;

/// File name fragments of known catalog databases
const CATALOG_PATTERNS: [&str; 3] = ["playlists_library", "playlist_database", "tracks.db"];

/// Validates that an output database path is safe to (over)write.
///
/// The file name must contain `required_pattern` (e.g. "analysis"), must not
/// be one of `source_paths`, and must not look like a catalog database.
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for source in source_paths {
        let same = output == *source
            || matches!(
                (output.canonicalize(), source.canonicalize()),
                (Ok(a), Ok(b)) if a == b
            );
        if same {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    for pattern in CATALOG_PATTERNS {
        if output_name.contains(pattern) {
            bail!(
                "Safety check failed: output '{}' matches catalog database pattern '{}'",
                output.display(),
                pattern
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/relations_analysis.db");
        let source = PathBuf::from("/data/playlists_library.db");
        assert!(validate_output_path(&output, "analysis", &[&source]).is_ok());
    }

    #[test]
    fn test_missing_pattern() {
        let output = PathBuf::from("/tmp/output.db");
        let source = PathBuf::from("/data/source.db");
        let result = validate_output_path(&output, "analysis", &[&source]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must contain 'analysis'"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/catalog_analysis.db");
        let result = validate_output_path(&path, "analysis", &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_catalog_name_blocked() {
        let output = PathBuf::from("/tmp/playlists_library_analysis.db");
        let source = PathBuf::from("/data/other.db");
        assert!(validate_output_path(&output, "analysis", &[&source]).is_err());
    }
}
