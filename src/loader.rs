//! Model Definition Loading
//!
//! Lists a model directory and reads every entry as a [`SchemaDefinition`].
//! Loading is I/O and deserialization only; whether a definition makes a
//! valid model is decided by the store at registration time.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::checksum::Checksum;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::LoadError;
use crate::schema::{DefinitionOrigin, SchemaDefinition};

/// Configuration for definition loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Sort the listing by file name instead of keeping listing order
    pub sorted: bool,
    /// Ignore entries whose file name starts with a dot
    pub skip_hidden: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            sorted: false,
            skip_hidden: true,
        }
    }
}

/// Where definitions come from: a directory listing plus a way to read
/// each listed entry.
pub trait DefinitionSource {
    /// List the entries of `dir`, in the order they should be loaded.
    /// Sources honour `config.skip_hidden` while listing.
    fn list(&self, dir: &Path, config: &LoadConfig) -> Result<Vec<PathBuf>, LoadError>;

    /// Read one entry as a definition
    fn load(&self, path: &Path) -> Result<SchemaDefinition, LoadError>;
}

/// Definitions stored as `.json` or `.toml` files in a flat directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DefinitionSource for FsSource {
    fn list(&self, dir: &Path, config: &LoadConfig) -> Result<Vec<PathBuf>, LoadError> {
        let skip = |path: &Path| config.skip_hidden && is_hidden(path);

        let mut paths = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !skip(e.path()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Broken links are reported before filter_entry sees them
                Err(e) if e.depth() > 0 && e.path().map_or(false, skip) => continue,
                Err(e) => {
                    return Err(LoadError::ListDirectory {
                        path: dir.to_path_buf(),
                        source: e.into(),
                    })
                }
            };
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn load(&self, path: &Path) -> Result<SchemaDefinition, LoadError> {
        let format = Format::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

        let content = fs::read(path).map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut definition = format.parse(path, &content)?;
        definition.origin = Some(DefinitionOrigin {
            path: path.to_path_buf(),
            checksum: Checksum::from_bytes(&content),
        });
        Ok(definition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn parse(self, path: &Path, content: &[u8]) -> Result<SchemaDefinition, LoadError> {
        match self {
            Self::Json => serde_json::from_slice(content).map_err(|e| LoadError::Json {
                path: path.to_path_buf(),
                source: e,
            }),
            Self::Toml => {
                let text = std::str::from_utf8(content).map_err(|e| LoadError::Utf8 {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                toml::from_str(text).map_err(|e| LoadError::Toml {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

/// Load every definition in `dir` from the filesystem
pub fn load_definitions(dir: impl AsRef<Path>) -> Result<Vec<SchemaDefinition>, LoadError> {
    load_definitions_from(
        &FsSource,
        dir.as_ref(),
        &LoadConfig::default(),
        &mut Diagnostics::default(),
    )
}

/// Load every definition listed by `source` for `dir`, in listing order
pub fn load_definitions_from<S: DefinitionSource + ?Sized>(
    source: &S,
    dir: &Path,
    config: &LoadConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SchemaDefinition>, LoadError> {
    let mut paths = source.list(dir, config)?;

    if config.skip_hidden {
        paths.retain(|p| !is_hidden(p));
    }
    if config.sorted {
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        let definition = source.load(&path)?;
        diagnostics.emit(Diagnostic::Loaded {
            name: definition.display_name(),
            path: path.display().to_string(),
        });
        definitions.push(definition);
    }

    let checksums: Vec<_> = definitions
        .iter()
        .filter_map(|d| d.origin.as_ref().map(|o| &o.checksum))
        .collect();
    if !checksums.is_empty() {
        let bundle = Checksum::combine(checksums);
        tracing::info!(
            dir = %dir.display(),
            count = definitions.len(),
            bundle = bundle.short(),
            "loaded model definitions"
        );
    }

    Ok(definitions)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("user.json"),
            r#"{"name": "User", "columns": {"email": "STRING"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("post.toml"),
            r#"
name = "Post"

[columns]
title = "STRING"

[[associations]]
type = "BelongsTo"
targetName = "User"
"#,
        )
        .unwrap();

        let config = LoadConfig { sorted: true, ..LoadConfig::default() };
        let defs =
            load_definitions_from(&FsSource, dir.path(), &config, &mut Diagnostics::default())
                .unwrap();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Post", "User"]);
        assert_eq!(defs[0].associations.len(), 1);
        assert!(defs[1].origin.is_some());
    }

    #[test]
    fn test_missing_directory_is_a_load_error() {
        let dir = tempdir().unwrap();
        let err = load_definitions(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, LoadError::ListDirectory { .. }));
    }

    #[test]
    fn test_malformed_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ name: ").unwrap();
        let err = load_definitions(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_a_load_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "# models").unwrap();
        let err = load_definitions(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_hidden_files_and_subdirectories_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".DS_Store"), [0u8, 1, 2]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/tag.json"), r#"{"name": "Tag"}"#).unwrap();
        fs::write(dir.path().join("user.json"), r#"{"name": "User"}"#).unwrap();

        let defs = load_definitions(dir.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "User");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_hidden_symlink_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("user.json"), r#"{"name": "User"}"#).unwrap();
        std::os::unix::fs::symlink("/nonexistent/lock", dir.path().join(".#user.json")).unwrap();

        let defs = load_definitions(dir.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "User");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_visible_symlink_still_fails() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent/post.json", dir.path().join("post.json")).unwrap();

        let err = load_definitions(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::ListDirectory { .. }));
    }

    #[test]
    fn test_invalid_utf8_toml_is_a_load_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("user.toml"), b"name = \"Us\xffer\"\n").unwrap();
        let err = load_definitions(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Utf8 { .. }));
    }

    #[test]
    fn test_no_semantic_validation_at_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("nameless.json"), r#"{"refs": [42]}"#).unwrap();
        let defs = load_definitions(dir.path()).unwrap();
        assert!(defs[0].name.is_empty());
        assert_eq!(defs[0].associations, [serde_json::json!(42)]);
    }
}
