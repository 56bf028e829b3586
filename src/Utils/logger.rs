use chrono::Local;
use csv::Writer;
use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::io;
use std::path::Path;

/// off/none, error, warn, info, debug, trace (any case)
pub fn parse_loglevel(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "off" | "none" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// log_<date>_<time>.txt
pub fn timestamped_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Terminal logger, plus a file logger when `log_file` is given.
/// A second call is a no-op: the global logger can only be set once.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> io::Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path)?));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

pub fn save_table_to_csv(headers: &[String], rows: &[Vec<String>], filename: &Path) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel("info"), Some(LevelFilter::Info));
        assert_eq!(parse_loglevel(" DEBUG "), Some(LevelFilter::Debug));
        assert_eq!(parse_loglevel("none"), Some(LevelFilter::Off));
        assert_eq!(parse_loglevel("Trace"), Some(LevelFilter::Trace));
        assert_eq!(parse_loglevel("verbose"), None);
    }

    #[test]
    fn test_timestamped_log_name() {
        let name = timestamped_log_name();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".txt"));
        // log_YYYY-mm-dd_HH-MM-SS.txt
        assert_eq!(name.len(), "log_".len() + 19 + ".txt".len());
    }

    #[test]
    fn test_save_table_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let headers = vec!["h".to_string(), "error, forward".to_string()];
        let rows = vec![
            vec!["0.1".to_string(), "5e-2".to_string()],
            vec!["0.01".to_string(), "5e-3".to_string()],
        ];
        save_table_to_csv(&headers, &rows, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "h,\"error, forward\"\n0.1,5e-2\n0.01,5e-3\n");
    }

    #[test]
    fn test_save_table_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("table.csv");
        assert!(save_table_to_csv(&["x".to_string()], &[], &path).is_err());
    }

    #[test]
    fn test_init_logger_off_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");
        init_logger(LevelFilter::Off, Some(&path)).unwrap();
        assert!(!path.exists());
    }
}
