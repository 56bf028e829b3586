//! Run settings, read from a lesson file of the form
//!
//! ```text
//! run
//! lessons: floating_point, variance
//! settings
//! seed: 42
//! sample_size: 1000
//! loglevel: info
//! log_file: false
//! plots: false
//! output_dir: results
//! ```
//!
//! Every key is optional; lines starting with `#`, `//`, `%` or `;` are comments.
use crate::Utils::logger::parse_loglevel;
use crate::Utils::task_parser::{DocumentMap, SectionMap, Value, parse_document_as};
use crate::lessons::Lesson;
use log::LevelFilter;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    UnknownLesson(String),
    InvalidValue { key: String, expected: &'static str },
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "cannot parse lesson file: {}", msg),
            ConfigError::UnknownLesson(name) => write!(f, "unknown lesson '{}'", name),
            ConfigError::InvalidValue { key, expected } => {
                write!(f, "value of '{}' must be {}", key, expected)
            }
            ConfigError::Io(e) => write!(f, "cannot read lesson file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub lessons: Vec<Lesson>,
    pub seed: u64,
    /// size of the random samples in the variance and least squares lessons
    pub sample_size: usize,
    pub loglevel: LevelFilter,
    /// also log to a timestamped file
    pub log_file: bool,
    pub plots: bool,
    /// where CSV tables, plots and the log file go; tables are only saved when set
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lessons: Lesson::all(),
            seed: 42,
            sample_size: 1000,
            loglevel: LevelFilter::Info,
            log_file: false,
            plots: false,
            output_dir: None,
        }
    }
}

fn single<'a>(section: Option<&'a SectionMap>, key: &str) -> Option<&'a Value> {
    section?.get(key)?.as_ref()?.first()
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        expected,
    }
}

impl Settings {
    pub fn from_document(document: &DocumentMap) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        let run = document.get("run");
        if let Some(Some(names)) = run.and_then(|section| section.get("lessons")) {
            settings.lessons = names
                .iter()
                .map(|value| {
                    let name = value.to_string_value();
                    Lesson::from_str(&name).map_err(|_| ConfigError::UnknownLesson(name))
                })
                .collect::<Result<Vec<Lesson>, ConfigError>>()?;
        }

        let section = document.get("settings");
        if let Some(value) = single(section, "seed") {
            settings.seed = match value.as_integer() {
                Some(seed) if seed >= 0 => seed as u64,
                _ => return Err(invalid("seed", "a non-negative integer")),
            };
        }
        if let Some(value) = single(section, "sample_size") {
            settings.sample_size = match value.as_integer() {
                Some(n) if n >= 2 => n as usize,
                _ => return Err(invalid("sample_size", "an integer of at least 2")),
            };
        }
        if let Some(value) = single(section, "loglevel") {
            settings.loglevel = parse_loglevel(&value.to_string_value())
                .ok_or_else(|| invalid("loglevel", "off, error, warn, info, debug or trace"))?;
        }
        if let Some(value) = single(section, "log_file") {
            settings.log_file = value.as_boolean().ok_or_else(|| invalid("log_file", "true or false"))?;
        }
        if let Some(value) = single(section, "plots") {
            settings.plots = value.as_boolean().ok_or_else(|| invalid("plots", "true or false"))?;
        }
        if let Some(value) = single(section, "output_dir") {
            settings.output_dir = Some(PathBuf::from(value.to_string_value()));
        }
        Ok(settings)
    }

    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let document = parse_document_as(text).map_err(ConfigError::Parse)?;
        Self::from_document(&document)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lesson_file() {
        let text = r#"
            # which lessons to run
            run
            lessons: floating_point, root_finding
            settings
            seed: 7
            sample_size: 250
            loglevel: warn
            log_file: true
            plots: true
            output_dir: results/today
        "#;
        let settings = Settings::from_text(text).unwrap();
        assert_eq!(settings.lessons, vec![Lesson::FloatingPoint, Lesson::RootFinding]);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.sample_size, 250);
        assert_eq!(settings.loglevel, LevelFilter::Warn);
        assert!(settings.log_file);
        assert!(settings.plots);
        assert_eq!(settings.output_dir, Some(PathBuf::from("results/today")));
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings = Settings::from_text("settings\nseed: 3").unwrap();
        assert_eq!(settings.seed, 3);
        assert_eq!(settings.lessons, Lesson::all());
        assert_eq!(settings.sample_size, 1000);
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            Settings::from_text("run\nlessons: fourier"),
            Err(ConfigError::UnknownLesson(name)) if name == "fourier"
        ));
        assert!(matches!(
            Settings::from_text("settings\nseed: -1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_text("settings\nplots: maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_text("settings\nloglevel: loud"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.txt");
        std::fs::write(&path, "run\nlessons: variance\nsettings\nloglevel: off").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.lessons, vec![Lesson::Variance]);
        assert_eq!(settings.loglevel, LevelFilter::Off);

        assert!(matches!(
            Settings::from_file(&dir.path().join("missing.txt")),
            Err(ConfigError::Io(_))
        ));
    }
}
