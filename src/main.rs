#![allow(non_snake_case)]
use RustedNumLessons::Utils::logger::{init_logger, timestamped_log_name};
use RustedNumLessons::lessons::run_lesson;
use RustedNumLessons::settings::Settings;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// usage: RustedNumLessons [lesson file]
/// without a lesson file every lesson runs with default settings
fn main() -> ExitCode {
    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::from_file(Path::new(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    let log_path = if settings.log_file {
        let dir = settings.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("cannot create {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
        Some(dir.join(timestamped_log_name()))
    } else {
        None
    };
    if let Err(e) = init_logger(settings.loglevel, log_path.as_deref()) {
        eprintln!("cannot create log file: {}", e);
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for &lesson in &settings.lessons {
        match run_lesson(lesson, &settings) {
            Ok(report) => {
                println!("{}", report.render());
                if let Some(dir) = &settings.output_dir {
                    if let Err(e) = report.save_csv(dir) {
                        eprintln!("cannot save tables of {}: {}", lesson, e);
                        error!("cannot save tables of {}: {}", lesson, e);
                        failed = true;
                    }
                }
            }
            Err(e) => {
                eprintln!("lesson {} failed: {}", lesson, e);
                error!("lesson {} failed: {}", lesson, e);
                failed = true;
            }
        }
    }
    info!("Program ended");
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
