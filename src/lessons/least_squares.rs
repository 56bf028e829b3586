//! Polynomial least squares two ways.
//!
//! Minimizing ||A c - y|| for the Vandermonde matrix A leads to the normal equations
//! A^T A c = A^T y. They are easy to write down but square the condition number:
//! cond(A^T A) = cond(A)^2. Factoring A = QR and solving R c = Q^T y works with A itself.
//! For a straight line both agree; for a degree 12 polynomial the normal equations lose
//! most of their digits.
use crate::lessons::{LessonError, Report, Table, full, sci};
use crate::settings::Settings;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// fewer data points than coefficients
    Underdetermined { points: usize, coefficients: usize },
    Singular,
    LengthMismatch { xs: usize, ys: usize },
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FitError::Underdetermined {
                points,
                coefficients,
            } => write!(f, "{} points cannot determine {} coefficients", points, coefficients),
            FitError::Singular => write!(f, "Matrix is singular to working precision"),
            FitError::LengthMismatch { xs, ys } => write!(f, "{} abscissae but {} ordinates", xs, ys),
        }
    }
}

impl std::error::Error for FitError {}

#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// c_0 + c_1 x + ... + c_d x^d
    pub coefficients: DVector<f64>,
    pub residual_norm: f64,
}

impl FitResult {
    pub fn evaluate(&self, x: f64) -> f64 {
        evaluate_polynomial(self.coefficients.as_slice(), x)
    }
}

/// Horner's scheme for c_0 + c_1 x + ... + c_d x^d
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Row i is 1, x_i, x_i^2, ..., x_i^degree
pub fn vandermonde(xs: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), degree + 1, |i, j| xs[i].powi(j as i32))
}

fn design(xs: &[f64], ys: &[f64], degree: usize) -> Result<(DMatrix<f64>, DVector<f64>), FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.len() < degree + 1 {
        return Err(FitError::Underdetermined {
            points: xs.len(),
            coefficients: degree + 1,
        });
    }
    Ok((vandermonde(xs, degree), DVector::from_column_slice(ys)))
}

fn residual_norm(a: &DMatrix<f64>, c: &DVector<f64>, y: &DVector<f64>) -> f64 {
    (a * c - y).norm()
}

/// Solves A^T A c = A^T y by LU
pub fn fit_normal_equations(xs: &[f64], ys: &[f64], degree: usize) -> Result<FitResult, FitError> {
    let (a, y) = design(xs, ys, degree)?;
    let ata = a.transpose() * &a;
    let aty = a.transpose() * &y;
    let coefficients = ata.lu().solve(&aty).ok_or(FitError::Singular)?;
    let residual_norm = residual_norm(&a, &coefficients, &y);
    Ok(FitResult {
        coefficients,
        residual_norm,
    })
}

/// Solves R c = Q^T y with the thin QR factorization of A
pub fn fit_qr(xs: &[f64], ys: &[f64], degree: usize) -> Result<FitResult, FitError> {
    let (a, y) = design(xs, ys, degree)?;
    let qr = a.clone().qr();
    let q = qr.q();
    let r = qr.r();
    let qty = q.transpose() * &y;
    let coefficients = r.solve_upper_triangular(&qty).ok_or(FitError::Singular)?;
    let residual_norm = residual_norm(&a, &coefficients, &y);
    Ok(FitResult {
        coefficients,
        residual_norm,
    })
}

/// Ratio of the largest to the smallest singular value; infinite for a rank deficient matrix
pub fn condition_number(a: &DMatrix<f64>) -> f64 {
    let singular_values = a.clone().svd(false, false).singular_values;
    let max = singular_values.max();
    let min = singular_values.min();
    if min == 0.0 { f64::INFINITY } else { max / min }
}

/// `n` points on [0, 1] of `intercept + slope x` plus uniform noise in [-noise, noise)
pub fn noisy_line(n: usize, slope: f64, intercept: f64, noise: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let xs: Vec<f64> = (0..n)
        .map(|i| if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 })
        .collect();
    let ys = xs
        .iter()
        .map(|x| intercept + slope * x + noise * rng.random_range(-1.0..1.0))
        .collect();
    (xs, ys)
}

fn max_coefficient_error(fit: &FitResult, exact: &[f64]) -> f64 {
    fit.coefficients
        .iter()
        .zip(exact)
        .map(|(c, e)| (c - e).abs())
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningDemo {
    pub degree: usize,
    pub cond_a: f64,
    pub cond_ata: f64,
    pub normal_error: f64,
    pub qr_error: f64,
}

/// Exact data from 1 + x + ... + x^degree on `points` equispaced points of [0, 1],
/// recovered by both methods
pub fn conditioning_demo(degree: usize, points: usize) -> Result<ConditioningDemo, FitError> {
    let xs: Vec<f64> = (0..points).map(|i| i as f64 / (points - 1) as f64).collect();
    let exact = vec![1.0; degree + 1];
    let ys: Vec<f64> = xs.iter().map(|&x| evaluate_polynomial(&exact, x)).collect();
    let a = vandermonde(&xs, degree);
    let ata = a.transpose() * &a;
    // A^T A may be singular to working precision long before A is
    let normal_error = match fit_normal_equations(&xs, &ys, degree) {
        Ok(normal) => max_coefficient_error(&normal, &exact),
        Err(FitError::Singular) => f64::INFINITY,
        Err(e) => return Err(e),
    };
    let qr = fit_qr(&xs, &ys, degree)?;
    Ok(ConditioningDemo {
        degree,
        cond_a: condition_number(&a),
        cond_ata: condition_number(&ata),
        normal_error,
        qr_error: max_coefficient_error(&qr, &exact),
    })
}

pub fn lesson(settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Least squares");

    let n = settings.sample_size.clamp(10, 10_000);
    let (xs, ys) = noisy_line(n, 2.0, 1.0, 0.1, settings.seed);
    info!("fitting a line to {} noisy points", n);
    report.paragraph(format!(
        "{} points of y = 1 + 2x with uniform noise of amplitude 0.1 (seed {}).",
        n, settings.seed
    ));
    let normal = fit_normal_equations(&xs, &ys, 1)?;
    let qr = fit_qr(&xs, &ys, 1)?;
    let mut line = Table::new("Straight line fit", &["method", "intercept", "slope", "residual norm"]);
    for (name, fit) in [("normal equations", &normal), ("QR", &qr)] {
        line.push_row(vec![
            name.to_string(),
            full(fit.coefficients[0]),
            full(fit.coefficients[1]),
            sci(fit.residual_norm),
        ]);
    }
    report.table(line);

    report.paragraph(
        "Exact data from 1 + x + ... + x^d on 50 points of [0, 1]. Every coefficient should \
         come back as 1; the error column shows how far off they are.",
    );
    let mut conditioning = Table::new(
        "Conditioning",
        &["degree", "cond(A)", "cond(A^T A)", "normal equations error", "QR error"],
    );
    for degree in [2, 4, 6, 8, 10, 12] {
        let demo = conditioning_demo(degree, 50)?;
        debug!("{:?}", demo);
        conditioning.push_row(vec![
            degree.to_string(),
            sci(demo.cond_a),
            sci(demo.cond_ata),
            sci(demo.normal_error),
            sci(demo.qr_error),
        ]);
    }
    report.table(conditioning);
    report.paragraph(
        "cond(A^T A) tracks cond(A)^2 until it hits 1/eps; past that point the normal \
         equations return coefficients with no correct digits while QR keeps about \
         16 - log10(cond(A)) of them.",
    );

    Ok(report)
}
