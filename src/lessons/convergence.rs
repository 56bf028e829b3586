//! Convergence: how fast does an approximation approach its limit, and when does round-off
//! stop it from getting there?
//!
//! If e_n is the error after n steps and e_{n+1} ~ C e_n^p, then p is the order of
//! convergence. It can be read off three consecutive errors:
//!
//! ```text
//! p ~ ln(e_{n+1} / e_n) / ln(e_n / e_{n-1})
//! ```
use crate::Utils::plots::plot_series;
use crate::lessons::{LessonError, Report, Table, plot_path, sci};
use crate::settings::Settings;
use itertools::Itertools;
use log::info;
use std::f64::consts::PI;

/// Partial sums S_1..S_n of sum_{k>=1} term(k)
pub fn partial_sums<F: Fn(usize) -> f64>(term: F, n: usize) -> Vec<f64> {
    (1..=n)
        .scan(0.0, |acc, k| {
            *acc += term(k);
            Some(*acc)
        })
        .collect()
}

/// Taylor polynomial of exp(x) of degree n, terms built by the recurrence t_k = t_{k-1} x / k
pub fn exp_taylor(x: f64, n: usize) -> f64 {
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..=n {
        term *= x / k as f64;
        sum += term;
    }
    sum
}

pub fn forward_difference<F: Fn(f64) -> f64>(f: &F, x: f64, h: f64) -> f64 {
    (f(x + h) - f(x)) / h
}

pub fn central_difference<F: Fn(f64) -> f64>(f: &F, x: f64, h: f64) -> f64 {
    (f(x + h) - f(x - h)) / (2.0 * h)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferenceRow {
    pub h: f64,
    pub forward_error: f64,
    pub central_error: f64,
}

/// Errors of both difference quotients against the exact derivative `df` for every step in `hs`.
/// Truncation error shrinks with h, round-off grows like eps/h.
pub fn difference_errors<F, D>(f: &F, df: &D, x: f64, hs: &[f64]) -> Vec<DifferenceRow>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let exact = df(x);
    hs.iter()
        .map(|&h| DifferenceRow {
            h,
            forward_error: (forward_difference(f, x, h) - exact).abs(),
            central_error: (central_difference(f, x, h) - exact).abs(),
        })
        .collect()
}

/// Observed order of convergence from consecutive errors. Zero and non-finite errors are
/// dropped first; fewer than three remaining errors give an empty vector.
pub fn estimate_order(errors: &[f64]) -> Vec<f64> {
    errors
        .iter()
        .copied()
        .filter(|e| e.is_finite() && *e > 0.0)
        .tuple_windows()
        .map(|(e0, e1, e2)| (e2 / e1).ln() / (e1 / e0).ln())
        .collect()
}

/// fixed point of cos
pub const DOTTIE: f64 = 0.7390851332151607;

/// Errors of x_{k+1} = cos(x_k) from x_0 = 1: linear convergence with rate |sin(DOTTIE)|
pub fn fixed_point_cos_errors(steps: usize) -> Vec<f64> {
    let mut x = 1.0f64;
    let mut errors = vec![(x - DOTTIE).abs()];
    for _ in 0..steps {
        x = x.cos();
        errors.push((x - DOTTIE).abs());
    }
    errors
}

/// Errors of Newton's method on x^2 - 2 from x_0 = 1: quadratic convergence
pub fn newton_sqrt2_errors(steps: usize) -> Vec<f64> {
    let root = 2f64.sqrt();
    let mut x = 1.0f64;
    let mut errors = vec![(x - root).abs()];
    for _ in 0..steps {
        x -= (x * x - 2.0) / (2.0 * x);
        errors.push((x - root).abs());
    }
    errors
}

pub fn lesson(settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Convergence");

    report.paragraph("Basel series: sum 1/k^2 = pi^2/6. The error after n terms is about 1/n.");
    let limit = PI * PI / 6.0;
    let sums = partial_sums(|k| 1.0 / (k as f64 * k as f64), 1_000_000);
    let mut basel = Table::new("Basel partial sums", &["n", "S_n", "error", "n * error"]);
    for p in 0..=6 {
        let n = 10usize.pow(p);
        let error = limit - sums[n - 1];
        basel.push_row(vec![
            n.to_string(),
            format!("{:.15}", sums[n - 1]),
            sci(error),
            format!("{:.6}", n as f64 * error),
        ]);
    }
    report.table(basel);

    report.paragraph(
        "Taylor series of exp(x). For x = -20 the terms alternate and reach 4e7 before \
         cancelling down to 2e-9, so the sum is swamped by round-off; 1/exp(20) is fine.",
    );
    let mut taylor = Table::new("Taylor series of exp", &["x", "degree", "series", "exp(x)", "relative error"]);
    for (x, n) in [(1.0, 20), (5.0, 40), (20.0, 100), (-20.0, 100)] {
        let series = exp_taylor(x, n);
        let exact = f64::exp(x);
        taylor.push_row(vec![
            x.to_string(),
            n.to_string(),
            sci(series),
            sci(exact),
            sci(((series - exact) / exact).abs()),
        ]);
    }
    let reciprocal = 1.0 / exp_taylor(20.0, 100);
    taylor.push_row(vec![
        "-20 as 1/exp(20)".to_string(),
        "100".to_string(),
        sci(reciprocal),
        sci(f64::exp(-20.0)),
        sci(((reciprocal - f64::exp(-20.0)) / f64::exp(-20.0)).abs()),
    ]);
    report.table(taylor);

    report.paragraph(
        "Difference quotients of sin at x = 1. Forward error ~ h/2 + eps/h is smallest near \
         h = sqrt(eps) ~ 1e-8; central error ~ h^2/6 + eps/h is smallest near 1e-5.",
    );
    let hs: Vec<f64> = (1..=15).map(|k| 10f64.powi(-k)).collect();
    let rows = difference_errors(&f64::sin, &f64::cos, 1.0, &hs);
    let mut differences = Table::new("Finite differences", &["h", "forward error", "central error"]);
    for row in &rows {
        differences.push_row(vec![sci(row.h), sci(row.forward_error), sci(row.central_error)]);
    }
    report.table(differences);

    report.paragraph("Observed order p from three consecutive errors.");
    let mut orders = Table::new("Order of convergence", &["method", "errors", "last estimated p"]);
    for (name, errors) in [
        ("fixed point x = cos(x)", fixed_point_cos_errors(20)),
        ("Newton on x^2 - 2", newton_sqrt2_errors(4)),
    ] {
        let p = estimate_order(&errors);
        orders.push_row(vec![
            name.to_string(),
            errors.len().to_string(),
            p.last().map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string()),
        ]);
    }
    report.table(orders);

    if settings.plots {
        let log10 = |e: f64| if e > 0.0 { e.log10() } else { f64::NAN };
        let series = vec![
            (
                "forward".to_string(),
                rows.iter().map(|r| (r.h.log10(), log10(r.forward_error))).collect(),
            ),
            (
                "central".to_string(),
                rows.iter().map(|r| (r.h.log10(), log10(r.central_error))).collect(),
            ),
        ];
        let path = plot_path(settings, "finite_differences.png")?;
        plot_series("Difference quotient error", "log10(h)", "log10(error)", &series, &path)?;
        info!("plot saved to {}", path.display());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_partial_sums() {
        let sums = partial_sums(|k| k as f64, 4);
        assert_eq!(sums, vec![1.0, 3.0, 6.0, 10.0]);
        assert!(partial_sums(|k| k as f64, 0).is_empty());

        let basel = partial_sums(|k| 1.0 / (k as f64 * k as f64), 1000);
        let error = PI * PI / 6.0 - basel[999];
        assert_relative_eq!(error, 1e-3, max_relative = 1e-2);
    }

    #[test]
    fn test_exp_taylor() {
        assert_relative_eq!(exp_taylor(1.0, 20), std::f64::consts::E, epsilon = 1e-14);
        assert_eq!(exp_taylor(0.0, 10), 1.0);
        assert_eq!(exp_taylor(3.0, 0), 1.0);

        let exact = f64::exp(-20.0);
        let direct = exp_taylor(-20.0, 100);
        let reciprocal = 1.0 / exp_taylor(20.0, 100);
        assert!(((direct - exact) / exact).abs() > 1e-3);
        assert!(((reciprocal - exact) / exact).abs() < 1e-12);
    }

    #[test]
    fn test_difference_quotients() {
        let f = |x: f64| x * x * x;
        // central difference is exact up to round-off for quadratics, off by h^2 for cubics
        assert_relative_eq!(central_difference(&f, 2.0, 1e-3), 12.0 + 1e-6, epsilon = 1e-9);
        assert_relative_eq!(forward_difference(&f, 2.0, 1e-3), 12.006001, epsilon = 1e-8);
    }

    #[test]
    fn test_difference_error_tradeoff() {
        let hs: Vec<f64> = (1..=15).map(|k| 10f64.powi(-k)).collect();
        let rows = difference_errors(&f64::sin, &f64::cos, 1.0, &hs);
        assert!(rows[0].forward_error > 1e-2);
        assert!(rows[0].central_error < rows[0].forward_error);

        let best = rows
            .iter()
            .min_by(|a, b| a.forward_error.total_cmp(&b.forward_error))
            .unwrap();
        assert!(best.h >= 1e-10 && best.h <= 1e-6, "best h = {}", best.h);
    }

    #[test]
    fn test_estimate_order() {
        assert!(estimate_order(&[1.0, 0.5]).is_empty());
        assert!(estimate_order(&[1.0, 0.0, 0.5]).is_empty());

        let linear = estimate_order(&fixed_point_cos_errors(20));
        assert_relative_eq!(*linear.last().unwrap(), 1.0, epsilon = 0.05);

        let quadratic = estimate_order(&newton_sqrt2_errors(4));
        assert_relative_eq!(*quadratic.last().unwrap(), 2.0, epsilon = 0.05);

        // exact geometric and squaring sequences
        let geometric = estimate_order(&[1.0, 0.5, 0.25, 0.125]);
        assert!(geometric.iter().all(|p| (p - 1.0).abs() < 1e-12));
        let squaring = estimate_order(&[1e-1, 1e-2, 1e-4, 1e-8]);
        assert_relative_eq!(squaring[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lesson_report() {
        let report = lesson(&Settings::default()).unwrap();
        assert_eq!(report.find_table("Basel partial sums").unwrap().rows.len(), 7);
        assert_eq!(report.find_table("Finite differences").unwrap().rows.len(), 15);
    }
}
