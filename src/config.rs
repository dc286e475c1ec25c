use crate::arguments::Format;
use crate::persist;
use crate::version::{BumpPolicy, VersionRecord};
use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml_edit::{DocumentMut, Item, TableLike, Value};

pub const DEFAULT_CONFIG_FILE: &str = "vbump.toml";

/// Printed by `--init`; parses as a valid config.
pub const EXAMPLE_CONFIG: &str = r#"# vbump configuration

[current_version]
major = "0"
minor = "1"
patch = "0"
build = "0"

[bump]
# Highest precedence first. Bumping a field resets every field listed after it.
reset_order = "major, minor, patch"
# Incremented on every bump.
auto = "build"

[syntax]
# Locates the version token on a line. Do not use 'pre' or 'post' as group names.
read_regex = 'version = "\d+\.\d+\.\d+[^"]*"'
write_dev = 'version = "{major}.{minor}.{patch}-dev.{build}"'
write_prod = 'version = "{major}.{minor}.{patch}"'

[write]
files = "Cargo.toml, pyproject.toml"
# Keep a <file>.bak copy of every rewritten file.
backup = true
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("Missing [{0}] section in config file")]
    MissingSection(&'static str),
    #[error("Missing '{key}' in [{section}] section of config file")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },
    #[error("Invalid value for '{key}' in [{section}] section: expected {expected}")]
    InvalidValue {
        section: &'static str,
        key: String,
        expected: &'static str,
    },
    #[error("Failed to save config file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read and write patterns from the `[syntax]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxPatterns {
    pub read_regex: String,
    pub write_dev: String,
    pub write_prod: String,
}

impl SyntaxPatterns {
    pub fn write_pattern(&self, format: Format) -> &str {
        match format {
            Format::Dev => &self.write_dev,
            Format::Prod => &self.write_prod,
        }
    }
}

/// The loaded config file.
///
/// The parsed document is kept alongside the typed values so that saving only
/// touches `[current_version]` and leaves comments and layout alone.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    document: DocumentMut,
    pub current_version: VersionRecord,
    pub policy: BumpPolicy,
    pub syntax: SyntaxPatterns,
    pub files: Vec<PathBuf>,
    pub backup: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from '{}'", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(path, &contents)?;

        // target files are relative to the config file, not the working directory
        if let Some(base) = path.parent() {
            config.files = config.files.into_iter().map(|file| base.join(file)).collect();
        }
        Ok(config)
    }

    /// Parses config `contents`; `path` is only remembered for [`Config::save`].
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Result<Self, ConfigError> {
        let path = path.into();
        let document: DocumentMut = contents.parse().map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        let current_version = read_version_record(&document)?;

        let bump = optional_section(&document, "bump")?;
        let policy = BumpPolicy {
            reset_order: read_list(bump, "bump", "reset_order")?,
            auto: read_list(bump, "bump", "auto")?,
        };

        let syntax = required_section(&document, "syntax")?;
        let syntax = SyntaxPatterns {
            read_regex: read_string(syntax, "syntax", "read_regex")?,
            write_dev: read_string(syntax, "syntax", "write_dev")?,
            write_prod: read_string(syntax, "syntax", "write_prod")?,
        };

        let write = optional_section(&document, "write")?;
        let files = read_list(write, "write", "files")?
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let backup = match write.and_then(|table| table.get("backup")) {
            None => true,
            Some(item) => item.as_bool().ok_or(ConfigError::InvalidValue {
                section: "write",
                key: "backup".to_string(),
                expected: "a boolean",
            })?,
        };

        Ok(Self {
            path,
            document,
            current_version,
            policy,
            syntax,
            files,
            backup,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the values of the current version fields.
    ///
    /// Only fields already present in `[current_version]` are updated. Returns
    /// whether anything changed.
    pub fn set_current_version(&mut self, record: &VersionRecord) -> bool {
        let mut changed = false;
        let Some(table) = self
            .document
            .get_mut("current_version")
            .and_then(Item::as_table_like_mut)
        else {
            return false;
        };

        for (field, value) in record.iter() {
            if self.current_version.get(field) == Some(value) {
                continue;
            }
            let Some(item) = table.get_mut(field) else {
                continue;
            };
            *item = Item::Value(formatted_like(item, value));
            self.current_version.set(field, value);
            changed = true;
        }

        changed
    }

    /// Writes the document back to [`Config::path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        persist::write_atomic(&self.path, &self.document.to_string()).map_err(|source| {
            ConfigError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// The config file as it would be saved.
    pub fn to_toml_string(&self) -> String {
        self.document.to_string()
    }
}

/// Builds the new value for `item`, keeping its integer/string style and its
/// surrounding whitespace and comments.
fn formatted_like(item: &Item, value: &str) -> Value {
    let mut new_value = match (item.as_integer(), value.parse::<i64>()) {
        (Some(_), Ok(number)) => Value::from(number),
        _ => Value::from(value),
    };
    if let Some(existing) = item.as_value() {
        *new_value.decor_mut() = existing.decor().clone();
    }
    new_value
}

fn required_section<'a>(
    document: &'a DocumentMut,
    section: &'static str,
) -> Result<&'a dyn TableLike, ConfigError> {
    optional_section(document, section)?.ok_or(ConfigError::MissingSection(section))
}

fn optional_section<'a>(
    document: &'a DocumentMut,
    section: &'static str,
) -> Result<Option<&'a dyn TableLike>, ConfigError> {
    match document.get(section) {
        None => Ok(None),
        Some(item) => item.as_table_like().map(Some).ok_or(ConfigError::InvalidValue {
            section,
            key: section.to_string(),
            expected: "a table",
        }),
    }
}

fn read_version_record(document: &DocumentMut) -> Result<VersionRecord, ConfigError> {
    let table = required_section(document, "current_version")?;
    let mut record = VersionRecord::new();
    for (field, item) in table.iter() {
        let value = if let Some(value) = item.as_str() {
            value.to_string()
        } else if let Some(value) = item.as_integer() {
            value.to_string()
        } else {
            return Err(ConfigError::InvalidValue {
                section: "current_version",
                key: field.to_string(),
                expected: "a string or an integer",
            });
        };
        record.set(field, value);
    }
    Ok(record)
}

fn read_string(
    table: &dyn TableLike,
    section: &'static str,
    key: &'static str,
) -> Result<String, ConfigError> {
    let item = table.get(key).ok_or(ConfigError::MissingKey { section, key })?;
    item.as_str()
        .map(str::to_string)
        .ok_or(ConfigError::InvalidValue {
            section,
            key: key.to_string(),
            expected: "a string",
        })
}

/// Reads either a comma separated string (`"major, minor, patch"`) or an
/// array of strings. A missing section or key is an empty list.
fn read_list(
    table: Option<&dyn TableLike>,
    section: &'static str,
    key: &'static str,
) -> Result<Vec<String>, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        section,
        key: key.to_string(),
        expected: "a comma separated string or an array of strings",
    };

    let Some(item) = table.and_then(|table| table.get(key)) else {
        return Ok(Vec::new());
    };
    if let Some(list) = item.as_str() {
        return Ok(split_list(list));
    }
    let array = item.as_array().ok_or_else(invalid)?;
    array
        .iter()
        .map(|value| value.as_str().map(|s| s.trim().to_string()).ok_or_else(invalid))
        .filter(|entry| !matches!(entry, Ok(s) if s.is_empty()))
        .collect()
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"# project version
[current_version]
major = "1"   # breaking
minor = "2"
patch = 5
build = "41"

[bump]
reset_order = "major, minor, patch"
auto = ["build"]

[syntax]
read_regex = 'version = "(?P<full>\d+\.\d+\.\d+)"'
write_dev = 'version = "{major}.{minor}.{patch}+{build}"'
write_prod = 'version = "{major}.{minor}.{patch}"'

[write]
files = "Cargo.toml, docs/VERSION"
"#;

    fn record(pairs: &[(&str, &str)]) -> VersionRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse("vbump.toml", CONFIG).unwrap();
        assert_eq!(
            config.current_version,
            record(&[("major", "1"), ("minor", "2"), ("patch", "5"), ("build", "41")])
        );
        assert_eq!(config.policy.reset_order, vec!["major", "minor", "patch"]);
        assert_eq!(config.policy.auto, vec!["build"]);
        assert_eq!(config.syntax.read_regex, r#"version = "(?P<full>\d+\.\d+\.\d+)""#);
        assert_eq!(
            config.syntax.write_pattern(Format::Prod),
            r#"version = "{major}.{minor}.{patch}""#
        );
        assert_eq!(
            config.syntax.write_pattern(Format::Dev),
            r#"version = "{major}.{minor}.{patch}+{build}""#
        );
        assert_eq!(
            config.files,
            vec![PathBuf::from("Cargo.toml"), PathBuf::from("docs/VERSION")]
        );
        assert!(config.backup);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.current_version.field_names(), vec!["major", "minor", "patch", "build"]);
        assert_eq!(config.policy.auto, vec!["build"]);
        assert_eq!(config.files.len(), 2);
    }

    #[test]
    fn test_optional_sections_default_to_empty() {
        let config = Config::parse(
            "vbump.toml",
            r#"
[current_version]
major = "1"

[syntax]
read_regex = '\d+'
write_dev = "{major}"
write_prod = "{major}"
"#,
        )
        .unwrap();
        assert!(config.policy.reset_order.is_empty());
        assert!(config.policy.auto.is_empty());
        assert!(config.files.is_empty());
        assert!(config.backup);
    }

    #[test]
    fn test_backup_can_be_disabled() {
        let contents = CONFIG.replace("[write]\n", "[write]\nbackup = false\n");
        let config = Config::parse("vbump.toml", &contents).unwrap();
        assert!(!config.backup);
    }

    #[test]
    fn test_empty_list_string() {
        let contents = CONFIG.replace("auto = [\"build\"]", "auto = \"\"");
        let config = Config::parse("vbump.toml", &contents).unwrap();
        assert!(config.policy.auto.is_empty());
    }

    #[test]
    fn test_missing_current_version_section() {
        let err = Config::parse(
            "vbump.toml",
            "[syntax]\nread_regex = 'x'\nwrite_dev = 'x'\nwrite_prod = 'x'\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("current_version")));
    }

    #[test]
    fn test_missing_syntax_key() {
        let contents = CONFIG.replace("write_prod = 'version = \"{major}.{minor}.{patch}\"'\n", "");
        let err = Config::parse("vbump.toml", &contents).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                section: "syntax",
                key: "write_prod"
            }
        ));
    }

    #[test]
    fn test_invalid_field_value() {
        let contents = CONFIG.replace("minor = \"2\"", "minor = 2.5");
        let err = Config::parse("vbump.toml", &contents).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "minor"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("vbump.toml", "[current_version\nmajor = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("vbump.toml"));
    }

    #[test]
    fn test_set_current_version_keeps_style_and_comments() {
        let mut config = Config::parse("vbump.toml", CONFIG).unwrap();
        let changed = config.set_current_version(&record(&[
            ("major", "2"),
            ("minor", "0"),
            ("patch", "0"),
            ("build", "42"),
        ]));
        assert!(changed);

        let saved = config.to_toml_string();
        assert!(saved.starts_with("# project version\n"));
        assert!(saved.contains("major = \"2\""));
        assert!(saved.contains("# breaking"));
        assert!(saved.contains("minor = \"0\"\n"));
        assert!(saved.contains("patch = 0\n"));
        assert!(saved.contains("build = \"42\"\n"));
        assert!(saved.contains("reset_order = \"major, minor, patch\""));
        assert_eq!(config.current_version.get("major"), Some("2"));
    }

    #[test]
    fn test_set_current_version_unchanged() {
        let mut config = Config::parse("vbump.toml", CONFIG).unwrap();
        let current = config.current_version.clone();
        assert!(!config.set_current_version(&current));
        assert_eq!(config.to_toml_string(), CONFIG);
    }

    #[test]
    fn test_set_current_version_ignores_unknown_fields() {
        let mut config = Config::parse("vbump.toml", CONFIG).unwrap();
        assert!(!config.set_current_version(&record(&[("epoch", "1")])));
        assert!(!config.current_version.contains("epoch"));
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("vbump.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let mut config = Config::load(&path).unwrap();
        assert_eq!(config.path(), path.as_path());
        assert_eq!(config.files[0], temp_dir.path().join("Cargo.toml"));

        config.set_current_version(&record(&[("patch", "6")]));
        config.save().unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.current_version.get("patch"), Some("6"));
        assert_eq!(reloaded.current_version.get("minor"), Some("2"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(temp_dir.path().join("vbump.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
