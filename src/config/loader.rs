/**
 * Config loader.
 *
 * DESIGN DECISION: a single TOML document, optionally overridden by an
 * explicit path, falling back to a platform config directory.
 * WHY: simplified from the teacher's 4-tier (system/team/project/user)
 * merge hierarchy in `config/loader.rs` — spec §6 defines one flat
 * per-component options table with no notion of per-level precedence, so
 * the merge logic the teacher needed has no counterpart here.
 *
 * PATTERN: teacher's `config/loader.rs` (toml + serde + `dirs` for
 * platform-specific config paths).
 */

use std::path::{Path, PathBuf};

use crate::error::{classify_io, Error, ErrorKind};

use super::options::Options;

/// `<platform config dir>/knowledge-extractor/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("knowledge-extractor").join("config.toml"))
}

/// Load options from `path` if given, else from the platform default
/// location if it exists, else return `Options::default()`.
pub fn load(path: Option<&Path>) -> Result<Options, Error> {
    let resolved = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let Some(resolved) = resolved else {
        return Ok(Options::default());
    };

    if !resolved.exists() {
        return Err(Error::new(
            ErrorKind::DocumentRead,
            format!("config file not found: {}", resolved.display()),
        ));
    }

    let raw = std::fs::read_to_string(&resolved).map_err(|e| classify_io(&e, resolved.display().to_string()))?;
    toml::from_str(&raw).map_err(|e| {
        Error::new(
            ErrorKind::SchemaValidation,
            format!("invalid config at {}: {}", resolved.display(), e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_path_argument_and_no_default_file_yields_defaults() {
        let options = load(None).unwrap();
        assert_eq!(options.knowledge_extractor.min_entity_confidence, 0.5);
    }

    #[test]
    fn loads_and_merges_overrides_from_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[knowledge_extractor]\nmin_entity_confidence = 0.75\noutput_dir = \"./out\"").unwrap();
        let options = load(Some(file.path())).unwrap();
        assert_eq!(options.knowledge_extractor.min_entity_confidence, 0.75);
        assert_eq!(options.knowledge_extractor.output_dir, "./out");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }
}
