//! Sample variance three ways.
//!
//! The two-pass formula `sum (x - mean)^2 / (n - 1)` and the one-pass textbook formula
//! `(sum x^2 - n mean^2) / (n - 1)` are equal in exact arithmetic. Shifting the data by a
//! constant c leaves the variance unchanged, but makes `sum x^2` and `n mean^2` huge and
//! nearly equal, so the textbook formula subtracts them away and keeps only round-off.
//! Welford's running update is one pass and stays accurate.
use crate::lessons::{LessonError, Report, Table, sci};
use crate::settings::Settings;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform samples on [0, 1) from a seeded generator, so every run prints the same table
pub fn random_samples(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<f64>()).collect()
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

pub fn variance_two_pass(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some(ss / (xs.len() - 1) as f64)
}

pub fn variance_textbook(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let sum_sq: f64 = xs.iter().map(|x| x * x).sum();
    let m = mean(xs)?;
    Some((sum_sq - n * m * m) / (n - 1.0))
}

/// Welford (1962): running mean and running sum of squared deviations
pub fn variance_welford(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let mut running_mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in xs.iter().enumerate() {
        let k = (i + 1) as f64;
        let delta = x - running_mean;
        running_mean += delta / k;
        m2 += delta * (x - running_mean);
    }
    Some(m2 / (xs.len() - 1) as f64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceComparison {
    pub shift: f64,
    pub two_pass: f64,
    pub textbook: f64,
    pub welford: f64,
}

/// The three estimates on `x + c` for every shift `c`. Empty when there are fewer than two samples.
pub fn shifted_comparison(xs: &[f64], shifts: &[f64]) -> Vec<VarianceComparison> {
    shifts
        .iter()
        .filter_map(|&shift| {
            let shifted: Vec<f64> = xs.iter().map(|x| x + shift).collect();
            Some(VarianceComparison {
                shift,
                two_pass: variance_two_pass(&shifted)?,
                textbook: variance_textbook(&shifted)?,
                welford: variance_welford(&shifted)?,
            })
        })
        .collect()
}

pub fn lesson(settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Variance formulas");
    let n = settings.sample_size.max(2);
    let xs = random_samples(n, settings.seed);
    info!("drew {} uniform samples with seed {}", n, settings.seed);

    report.paragraph(format!(
        "{} uniform samples on [0, 1), seed {}. The exact variance of the distribution is 1/12 = {:.6}.",
        n,
        settings.seed,
        1.0 / 12.0
    ));
    report.paragraph(
        "Adding a constant c changes nothing in exact arithmetic. The one-pass formula \
         (sum x^2 - n mean^2)/(n-1) subtracts two numbers of size n c^2 and loses the answer.",
    );

    let shifts: Vec<f64> = [0, 2, 4, 6, 8, 9, 10].iter().map(|&k| 10f64.powi(k)).collect();
    let rows = shifted_comparison(&xs, &shifts);
    let reference = rows.first().map(|r| r.two_pass).unwrap_or(f64::NAN);

    let mut table = Table::new(
        "Variance of x + c",
        &["c", "two pass", "textbook", "Welford", "textbook relative error"],
    );
    for row in &rows {
        if row.textbook < 0.0 {
            warn!("textbook variance went negative at shift {:e}", row.shift);
        }
        table.push_row(vec![
            sci(row.shift),
            sci(row.two_pass),
            sci(row.textbook),
            sci(row.welford),
            sci(((row.textbook - reference) / reference).abs()),
        ]);
    }
    report.table(table);
    report.paragraph(
        "The two-pass and Welford columns only see the rounding of x + c itself; the textbook \
         column drifts, and for large c it can even turn negative.",
    );
    Ok(report)
}
