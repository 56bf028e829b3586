//! Numerical analysis lessons.
//!
//! Every lesson is an independent, stateless demonstration: it evaluates a handful of
//! closed-form expressions on hard-coded or randomly generated inputs and returns a
//! [`Report`], a linear sequence of narrative paragraphs and tables (plus optional plots).
//! Nothing is shared between lessons.
/// IEEE 754 doubles: layout, limits, round-off and cancellation
pub mod floating_point;
/// two algebraically equivalent variance formulas that disagree numerically
pub mod variance;
/// series, Taylor polynomials, finite differences and the order of convergence
pub mod convergence;
/// bisection, fixed point iteration, Newton and secant methods on one or two example functions
pub mod root_finding;
/// Lagrange and Newton forms, Runge phenomenon, Chebyshev nodes, piecewise linear interpolation
pub mod interpolation;
/// polynomial least squares via normal equations and QR
pub mod least_squares;

use crate::Utils::logger::save_table_to_csv;
use crate::lessons::interpolation::InterpolationError;
use crate::lessons::least_squares::FitError;
use crate::lessons::root_finding::RootFindingError;
use crate::settings::Settings;
use log::info;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumIter, EnumString};
use tabled::{builder::Builder, settings::Style};

/// The lessons, named the way they are written in a lesson file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Lesson {
    FloatingPoint,
    Variance,
    Convergence,
    RootFinding,
    Interpolation,
    LeastSquares,
}

impl Lesson {
    pub fn all() -> Vec<Lesson> {
        use strum::IntoEnumIterator;
        Lesson::iter().collect()
    }
}

/// Errors a lesson can surface. Arithmetic itself never errors (IEEE defaults apply);
/// these come from the demonstrated methods refusing their input or from writing output.
#[derive(Debug)]
pub enum LessonError {
    RootFinding(RootFindingError),
    Interpolation(InterpolationError),
    Fit(FitError),
    Io(io::Error),
    Plot(String),
}

impl fmt::Display for LessonError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LessonError::RootFinding(e) => write!(f, "root finding failed: {}", e),
            LessonError::Interpolation(e) => write!(f, "interpolation failed: {}", e),
            LessonError::Fit(e) => write!(f, "least squares fit failed: {}", e),
            LessonError::Io(e) => write!(f, "i/o error: {}", e),
            LessonError::Plot(msg) => write!(f, "plotting failed: {}", msg),
        }
    }
}

impl std::error::Error for LessonError {}

impl From<RootFindingError> for LessonError {
    fn from(e: RootFindingError) -> Self {
        LessonError::RootFinding(e)
    }
}

impl From<InterpolationError> for LessonError {
    fn from(e: InterpolationError) -> Self {
        LessonError::Interpolation(e)
    }
}

impl From<FitError> for LessonError {
    fn from(e: FitError) -> Self {
        LessonError::Fit(e)
    }
}

impl From<io::Error> for LessonError {
    fn from(e: io::Error) -> Self {
        LessonError::Io(e)
    }
}

impl From<Box<dyn std::error::Error>> for LessonError {
    fn from(e: Box<dyn std::error::Error>) -> Self {
        LessonError::Plot(e.to_string())
    }
}

/// A named table: header row and rows of already formatted cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width must match headers");
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.clone());
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(String),
    Table(Table),
}

/// Output of one lesson, in reading order
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Text(text.into()));
    }

    pub fn table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Text(_) => None,
        })
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables().find(|t| t.name == name)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(self.title.len());
        out.push_str(&format!("{}\n{}\n\n", self.title, rule));
        for block in &self.blocks {
            match block {
                Block::Text(text) => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                Block::Table(table) => {
                    out.push_str(&format!("{}\n", table.name));
                    out.push_str(&table.render());
                    out.push_str("\n\n");
                }
            }
        }
        out
    }

    /// Writes every table as `<title>_<table>.csv` into `dir`, creating it if needed
    pub fn save_csv(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for table in self.tables() {
            let filename = dir.join(format!("{}_{}.csv", slug(&self.title), slug(&table.name)));
            save_table_to_csv(&table.headers, &table.rows, &filename)?;
            written.push(filename);
        }
        info!("saved {} tables of '{}' to {}", written.len(), self.title, dir.display());
        Ok(written)
    }
}

pub(crate) fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// scientific notation used in all tables
pub(crate) fn sci(x: f64) -> String {
    format!("{:.6e}", x)
}

/// every significant digit of a double
pub(crate) fn full(x: f64) -> String {
    format!("{:.17e}", x)
}

/// where plots go: the output directory if one is configured, otherwise the working directory
pub(crate) fn plot_path(settings: &Settings, name: &str) -> io::Result<PathBuf> {
    match &settings.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(dir.join(name))
        }
        None => Ok(PathBuf::from(name)),
    }
}

pub fn run_lesson(lesson: Lesson, settings: &Settings) -> Result<Report, LessonError> {
    info!("running lesson {}", lesson);
    let report = match lesson {
        Lesson::FloatingPoint => floating_point::lesson(settings)?,
        Lesson::Variance => variance::lesson(settings)?,
        Lesson::Convergence => convergence::lesson(settings)?,
        Lesson::RootFinding => root_finding::lesson(settings)?,
        Lesson::Interpolation => interpolation::lesson(settings)?,
        Lesson::LeastSquares => least_squares::lesson(settings)?,
    };
    info!("lesson {} produced {} blocks", lesson, report.blocks.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_lesson_names() {
        assert_eq!(Lesson::from_str("floating_point").unwrap(), Lesson::FloatingPoint);
        assert_eq!(Lesson::from_str("least_squares").unwrap(), Lesson::LeastSquares);
        assert_eq!(Lesson::RootFinding.to_string(), "root_finding");
        assert!(Lesson::from_str("fourier").is_err());
        assert_eq!(Lesson::all().len(), 6);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("IEEE 754: layout"), "ieee_754_layout");
        assert_eq!(slug("  x + 1/x "), "x_1_x");
    }

    #[test]
    fn test_report_render_keeps_order() {
        let mut report = Report::new("Demo");
        report.paragraph("first");
        let mut table = Table::new("numbers", &["x", "x^2"]);
        table.push_row(vec!["2".to_string(), "4".to_string()]);
        report.table(table);
        report.paragraph("last");

        let text = report.render();
        let first = text.find("first").unwrap();
        let numbers = text.find("numbers").unwrap();
        let last = text.find("last").unwrap();
        assert!(first < numbers && numbers < last);
        assert!(text.starts_with("Demo\n===="));
        assert_eq!(report.tables().count(), 1);
        assert!(report.find_table("numbers").is_some());
    }

    #[test]
    fn test_report_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new("Demo lesson");
        let mut table = Table::new("squares", &["x", "x^2"]);
        table.push_row(vec!["3".to_string(), "9".to_string()]);
        report.table(table);

        let written = report.save_csv(dir.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("demo_lesson_squares.csv"));
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content, "x,x^2\n3,9\n");
    }
}
