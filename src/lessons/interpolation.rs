//! Polynomial interpolation and the Runge phenomenon.
//!
//! The interpolating polynomial through n+1 distinct nodes is unique; Lagrange and Newton
//! are two ways of writing it down. Whether it approximates the underlying function well
//! depends on where the nodes are: on equispaced nodes the error for Runge's function
//! 1/(1 + 25x^2) grows with the degree, on Chebyshev nodes it shrinks. Piecewise linear
//! interpolation sidesteps the problem at the price of slow (h^2) convergence.
use crate::Utils::plots::plot_series;
use crate::lessons::{LessonError, Report, Table, plot_path, sci};
use crate::settings::Settings;
use log::{info, warn};
use splines::{Interpolation, Key, Spline};
use std::f64::consts::PI;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationError {
    EmptyNodes,
    LengthMismatch { nodes: usize, values: usize },
    RepeatedNode(f64),
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterpolationError::EmptyNodes => write!(f, "No interpolation nodes given"),
            InterpolationError::LengthMismatch { nodes, values } => {
                write!(f, "{} nodes but {} values", nodes, values)
            }
            InterpolationError::RepeatedNode(x) => write!(f, "Node {} appears more than once", x),
        }
    }
}

impl std::error::Error for InterpolationError {}

fn check_nodes(xs: &[f64], ys: &[f64]) -> Result<(), InterpolationError> {
    if xs.is_empty() {
        return Err(InterpolationError::EmptyNodes);
    }
    if xs.len() != ys.len() {
        return Err(InterpolationError::LengthMismatch {
            nodes: xs.len(),
            values: ys.len(),
        });
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(InterpolationError::RepeatedNode(w[0]));
    }
    Ok(())
}

/// n points from a to b inclusive; a single point sits at a
pub fn equispaced_nodes(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let h = (b - a) / (n - 1) as f64;
            (0..n).map(|i| a + i as f64 * h).collect()
        }
    }
}

/// Roots of the Chebyshev polynomial T_n mapped from [-1, 1] to [a, b]
pub fn chebyshev_nodes(a: f64, b: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| {
            let t = ((2 * k + 1) as f64 * PI / (2 * n) as f64).cos();
            0.5 * (a + b) + 0.5 * (b - a) * t
        })
        .collect()
}

fn lagrange_sum(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    let mut result = 0.0;
    for i in 0..n {
        let mut term = ys[i];
        for j in 0..n {
            if i != j {
                term *= (x - xs[j]) / (xs[i] - xs[j]);
            }
        }
        result += term;
    }
    result
}

/// Divided difference coefficients f[x0], f[x0,x1], ..., computed in place
fn divided_differences(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut coef = ys.to_vec();
    for j in 1..n {
        for i in (j..n).rev() {
            coef[i] = (coef[i] - coef[i - 1]) / (xs[i] - xs[i - j]);
        }
    }
    coef
}

fn newton_horner(x: f64, xs: &[f64], coef: &[f64]) -> f64 {
    let n = coef.len();
    if n == 0 {
        return 0.0;
    }
    let mut result = coef[n - 1];
    for i in (0..n - 1).rev() {
        result = result * (x - xs[i]) + coef[i];
    }
    result
}

/// Lagrange form
pub fn lagrange_interpolate(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpolationError> {
    check_nodes(xs, ys)?;
    Ok(lagrange_sum(x, xs, ys))
}

pub fn newton_divided_differences(xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, InterpolationError> {
    check_nodes(xs, ys)?;
    Ok(divided_differences(xs, ys))
}

/// Newton form evaluated by Horner's scheme; `coef` as returned by [`newton_divided_differences`]
pub fn newton_interpolate(x: f64, xs: &[f64], coef: &[f64]) -> Result<f64, InterpolationError> {
    check_nodes(xs, coef)?;
    Ok(newton_horner(x, xs, coef))
}

/// Interpolating polynomial in Newton form, nodes validated once
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonPolynomial {
    nodes: Vec<f64>,
    coefficients: Vec<f64>,
}

impl NewtonPolynomial {
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, InterpolationError> {
        check_nodes(xs, ys)?;
        Ok(Self {
            nodes: xs.to_vec(),
            coefficients: divided_differences(xs, ys),
        })
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        newton_horner(x, &self.nodes, &self.coefficients)
    }
}

/// Broken line through the nodes, held constant outside them
pub struct PiecewiseLinear {
    spline: Spline<f64, f64>,
}

impl PiecewiseLinear {
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, InterpolationError> {
        check_nodes(xs, ys)?;
        let keys = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| Key::new(x, y, Interpolation::Linear))
            .collect();
        Ok(Self {
            spline: Spline::from_vec(keys),
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.spline.clamped_sample(x).unwrap_or(f64::NAN)
    }
}

/// max |f - p| on `samples` equispaced points of [a, b]
pub fn max_error<F, P>(f: F, p: P, a: f64, b: f64, samples: usize) -> f64
where
    F: Fn(f64) -> f64,
    P: Fn(f64) -> f64,
{
    equispaced_nodes(a, b, samples)
        .into_iter()
        .map(|x| (f(x) - p(x)).abs())
        .fold(0.0, f64::max)
}

pub fn runge(x: f64) -> f64 {
    1.0 / (1.0 + 25.0 * x * x)
}

const ERROR_SAMPLES: usize = 2001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RungeRow {
    pub degree: usize,
    pub equispaced: f64,
    pub chebyshev: f64,
    pub piecewise_linear: f64,
}

/// Max error on [-1, 1] of the three interpolants of Runge's function with degree + 1 nodes
pub fn runge_table(degrees: &[usize]) -> Result<Vec<RungeRow>, InterpolationError> {
    degrees
        .iter()
        .map(|&degree| {
            let n = degree + 1;
            let equi_x = equispaced_nodes(-1.0, 1.0, n);
            let equi_y: Vec<f64> = equi_x.iter().map(|&x| runge(x)).collect();
            let cheb_x = chebyshev_nodes(-1.0, 1.0, n);
            let cheb_y: Vec<f64> = cheb_x.iter().map(|&x| runge(x)).collect();

            let equi = NewtonPolynomial::new(&equi_x, &equi_y)?;
            let cheb = NewtonPolynomial::new(&cheb_x, &cheb_y)?;
            let linear = PiecewiseLinear::new(&equi_x, &equi_y)?;

            Ok(RungeRow {
                degree,
                equispaced: max_error(runge, |x| equi.evaluate(x), -1.0, 1.0, ERROR_SAMPLES),
                chebyshev: max_error(runge, |x| cheb.evaluate(x), -1.0, 1.0, ERROR_SAMPLES),
                piecewise_linear: max_error(runge, |x| linear.evaluate(x), -1.0, 1.0, ERROR_SAMPLES),
            })
        })
        .collect()
}

pub fn lesson(settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Interpolation");

    report.paragraph("Lagrange and Newton forms of the same polynomial through sin at 5 nodes on [0, pi].");
    let xs = equispaced_nodes(0.0, PI, 5);
    let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
    let newton_form = NewtonPolynomial::new(&xs, &ys)?;
    let mut forms = Table::new("Two forms, one polynomial", &["x", "sin(x)", "Lagrange", "Newton", "difference"]);
    for x in equispaced_nodes(0.0, PI, 9) {
        let l = lagrange_interpolate(x, &xs, &ys)?;
        let n = newton_form.evaluate(x);
        forms.push_row(vec![
            format!("{:.6}", x),
            format!("{:.12}", x.sin()),
            format!("{:.12}", l),
            format!("{:.12}", n),
            sci((l - n).abs()),
        ]);
    }
    report.table(forms);

    report.paragraph(
        "Runge's function 1/(1 + 25x^2) on [-1, 1]. Equispaced nodes: the error blows up near \
         the ends as the degree grows. Chebyshev nodes cluster at the ends and the error decays.",
    );
    let degrees = [2, 4, 6, 8, 10, 12, 16, 20];
    let rows = runge_table(&degrees)?;
    let mut runge_errors = Table::new(
        "Runge phenomenon",
        &["degree", "equispaced", "Chebyshev", "piecewise linear"],
    );
    for row in &rows {
        if row.equispaced > 1.0 {
            warn!("equispaced interpolant of degree {} is off by {:.3}", row.degree, row.equispaced);
        }
        runge_errors.push_row(vec![
            row.degree.to_string(),
            sci(row.equispaced),
            sci(row.chebyshev),
            sci(row.piecewise_linear),
        ]);
    }
    report.table(runge_errors);

    if settings.plots {
        let degree = 12;
        let equi_x = equispaced_nodes(-1.0, 1.0, degree + 1);
        let equi_y: Vec<f64> = equi_x.iter().map(|&x| runge(x)).collect();
        let cheb_x = chebyshev_nodes(-1.0, 1.0, degree + 1);
        let cheb_y: Vec<f64> = cheb_x.iter().map(|&x| runge(x)).collect();
        let equi = NewtonPolynomial::new(&equi_x, &equi_y)?;
        let cheb = NewtonPolynomial::new(&cheb_x, &cheb_y)?;
        let grid = equispaced_nodes(-1.0, 1.0, 401);
        let curve = |p: &dyn Fn(f64) -> f64| grid.iter().map(|&x| (x, p(x))).collect::<Vec<_>>();
        let series = vec![
            ("1/(1 + 25x^2)".to_string(), curve(&runge)),
            ("equispaced, degree 12".to_string(), curve(&|x: f64| equi.evaluate(x))),
            ("Chebyshev, degree 12".to_string(), curve(&|x: f64| cheb.evaluate(x))),
        ];
        let path = plot_path(settings, "runge.png")?;
        plot_series("Runge phenomenon", "x", "y", &series, &path)?;
        info!("plot saved to {}", path.display());
    }

    Ok(report)
}
