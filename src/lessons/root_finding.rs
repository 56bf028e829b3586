//! Four classical methods for f(x) = 0, each shown on the same two example functions with the
//! same stopping rule, so the iteration counts can be compared:
//!
//! - bisection: halve a bracketing interval, linear convergence with rate 1/2
//! - fixed point iteration x = g(x): linear with rate |g'(root)|
//! - Newton: x - f(x)/f'(x), quadratic near a simple root
//! - secant: Newton with the derivative replaced by a difference quotient, order ~1.618
//!
//! Every method returns its full iteration history.
use crate::lessons::{LessonError, Report, Table, full, sci};
use crate::settings::Settings;
use log::{debug, info};
use std::fmt;

/// |x_{k+1} - x_k| below this stops every method
pub const TOLERANCE: f64 = 1e-12;
pub const MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum RootFindingError {
    /// f(a) and f(b) have the same sign
    InvalidInterval,
    DerivativeZero(f64),
    /// no derivative supplied to Newton's method
    MissingDerivative,
    /// the iteration left the finite numbers
    Diverged(f64),
    MaxIterationsReached,
}

impl fmt::Display for RootFindingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RootFindingError::InvalidInterval => {
                write!(f, "Function has the same sign at both ends of the interval")
            }
            RootFindingError::DerivativeZero(x) => write!(f, "Derivative is zero at x = {}", x),
            RootFindingError::MissingDerivative => write!(f, "Newton's method needs a derivative"),
            RootFindingError::Diverged(x) => write!(f, "Iteration diverged, last value {}", x),
            RootFindingError::MaxIterationsReached => write!(f, "Maximum iterations reached"),
        }
    }
}

impl std::error::Error for RootFindingError {}

/// f(x) = 0
pub trait NonlinearFunction {
    fn evaluate(&self, x: f64) -> f64;

    /// Analytical derivative, if known
    fn derivative(&self, _x: f64) -> Option<f64> {
        None
    }

    fn name(&self) -> &str {
        "unnamed_function"
    }
}

pub struct ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    func: F,
    name: String,
}

impl<F> ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(func: F, name: &str) -> Self {
        Self {
            func,
            name: name.to_string(),
        }
    }
}

impl<F> NonlinearFunction for ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    func: F,
    derivative_func: D,
    name: String,
}

impl<F, D> FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    pub fn new(func: F, derivative_func: D, name: &str) -> Self {
        Self {
            func,
            derivative_func,
            name: name.to_string(),
        }
    }
}

impl<F, D> NonlinearFunction for FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        Some((self.derivative_func)(x))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Iterate {
    pub k: usize,
    pub x: f64,
    pub fx: f64,
}

/// Iteration history of one method on one function
#[derive(Debug, Clone, PartialEq)]
pub struct RootTrace {
    pub method: &'static str,
    pub function: String,
    pub iterates: Vec<Iterate>,
}

impl RootTrace {
    fn new<F: NonlinearFunction>(method: &'static str, function: &F) -> Self {
        Self {
            method,
            function: function.name().to_string(),
            iterates: Vec::new(),
        }
    }

    fn push(&mut self, x: f64, fx: f64) {
        let k = self.iterates.len();
        debug!("{} k = {}: x = {:.16}, f(x) = {:.3e}", self.method, k, x, fx);
        self.iterates.push(Iterate { k, x, fx });
    }

    /// last iterate
    pub fn root(&self) -> f64 {
        self.iterates.last().map(|it| it.x).unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.iterates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterates.is_empty()
    }
}

/// Requires f(a) f(b) <= 0. Records the midpoint of every interval.
pub fn bisection<F: NonlinearFunction>(function: &F, mut a: f64, mut b: f64) -> Result<RootTrace, RootFindingError> {
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    let mut trace = RootTrace::new("bisection", function);
    let mut fa = function.evaluate(a);
    let fb = function.evaluate(b);
    if fa == 0.0 {
        trace.push(a, fa);
        return Ok(trace);
    }
    if fb == 0.0 {
        trace.push(b, fb);
        return Ok(trace);
    }
    // compare signs, the product of two tiny values underflows to 0
    if fa.signum() == fb.signum() {
        return Err(RootFindingError::InvalidInterval);
    }

    for _ in 0..MAX_ITERATIONS {
        let c = a + (b - a) / 2.0;
        let fc = function.evaluate(c);
        trace.push(c, fc);
        if fc == 0.0 || (b - a) / 2.0 < TOLERANCE {
            return Ok(trace);
        }
        if fa.signum() == fc.signum() {
            a = c;
            fa = fc;
        } else {
            b = c;
        }
    }
    Err(RootFindingError::MaxIterationsReached)
}

/// x_{k+1} = g(x_k). `g` is the iteration map, not the function whose root is wanted;
/// the recorded residual is g(x) - x.
pub fn fixed_point<G: NonlinearFunction>(g: &G, x0: f64) -> Result<RootTrace, RootFindingError> {
    let mut trace = RootTrace::new("fixed point", g);
    let mut x = x0;
    for _ in 0..MAX_ITERATIONS {
        let next = g.evaluate(x);
        trace.push(x, next - x);
        if !next.is_finite() {
            return Err(RootFindingError::Diverged(x));
        }
        if (next - x).abs() < TOLERANCE {
            trace.push(next, g.evaluate(next) - next);
            return Ok(trace);
        }
        x = next;
    }
    Err(RootFindingError::MaxIterationsReached)
}

pub fn newton<F: NonlinearFunction>(function: &F, x0: f64) -> Result<RootTrace, RootFindingError> {
    let mut trace = RootTrace::new("Newton", function);
    let mut x = x0;
    for _ in 0..MAX_ITERATIONS {
        let fx = function.evaluate(x);
        trace.push(x, fx);
        if fx == 0.0 {
            return Ok(trace);
        }
        let dfx = function
            .derivative(x)
            .ok_or(RootFindingError::MissingDerivative)?;
        if dfx == 0.0 {
            return Err(RootFindingError::DerivativeZero(x));
        }
        let next = x - fx / dfx;
        if !next.is_finite() {
            return Err(RootFindingError::Diverged(x));
        }
        if (next - x).abs() < TOLERANCE {
            trace.push(next, function.evaluate(next));
            return Ok(trace);
        }
        x = next;
    }
    Err(RootFindingError::MaxIterationsReached)
}

/// Two starting points; f(x0) == f(x1) leaves the secant horizontal and is reported as a zero derivative.
pub fn secant<F: NonlinearFunction>(function: &F, mut x0: f64, mut x1: f64) -> Result<RootTrace, RootFindingError> {
    let mut trace = RootTrace::new("secant", function);
    let mut f0 = function.evaluate(x0);
    trace.push(x0, f0);
    for _ in 0..MAX_ITERATIONS {
        let f1 = function.evaluate(x1);
        trace.push(x1, f1);
        if f1 == 0.0 {
            return Ok(trace);
        }
        if f1 == f0 {
            return Err(RootFindingError::DerivativeZero(x1));
        }
        let next = x1 - f1 * (x1 - x0) / (f1 - f0);
        if !next.is_finite() {
            return Err(RootFindingError::Diverged(x1));
        }
        if (next - x1).abs() < TOLERANCE {
            trace.push(next, function.evaluate(next));
            return Ok(trace);
        }
        x0 = x1;
        f0 = f1;
        x1 = next;
    }
    Err(RootFindingError::MaxIterationsReached)
}

/// root of x^3 - x - 1 (the plastic number)
pub const CUBIC_ROOT: f64 = 1.324717957244746;
/// root of cos(x) - x
pub const COS_ROOT: f64 = 0.7390851332151607;

fn trace_table(trace: &RootTrace, exact: f64) -> Table {
    let mut table = Table::new(
        &format!("{} on {}", trace.method, trace.function),
        &["k", "x_k", "residual", "error"],
    );
    for it in &trace.iterates {
        table.push_row(vec![
            it.k.to_string(),
            full(it.x),
            sci(it.fx),
            sci((it.x - exact).abs()),
        ]);
    }
    table
}

pub fn lesson(_settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Root finding");
    report.paragraph(format!(
        "Every method stops once two successive iterates differ by less than {:e}, \
         or after {} iterations.",
        TOLERANCE, MAX_ITERATIONS
    ));

    let cubic = FunctionWithDerivative::new(|x| x * x * x - x - 1.0, |x| 3.0 * x * x - 1.0, "x^3 - x - 1");
    // x = (x + 1)^(1/3) has |g'| ~ 0.19 at the root
    let cubic_map = ClosureFunction::new(|x: f64| (x + 1.0).cbrt(), "(x + 1)^(1/3)");
    let cosine = FunctionWithDerivative::new(|x: f64| x.cos() - x, |x: f64| -x.sin() - 1.0, "cos(x) - x");
    let cosine_map = ClosureFunction::new(|x: f64| x.cos(), "cos(x)");

    let traces = vec![
        (bisection(&cubic, 1.0, 2.0)?, CUBIC_ROOT),
        (fixed_point(&cubic_map, 1.0)?, CUBIC_ROOT),
        (newton(&cubic, 1.5)?, CUBIC_ROOT),
        (secant(&cubic, 1.0, 2.0)?, CUBIC_ROOT),
        (bisection(&cosine, 0.0, 1.0)?, COS_ROOT),
        (fixed_point(&cosine_map, 1.0)?, COS_ROOT),
        (newton(&cosine, 1.0)?, COS_ROOT),
        (secant(&cosine, 0.0, 1.0)?, COS_ROOT),
    ];

    let mut summary = Table::new("Iterations to converge", &["method", "function", "iterations", "root", "error"]);
    for (trace, exact) in &traces {
        info!("{} on {} took {} iterates", trace.method, trace.function, trace.len());
        summary.push_row(vec![
            trace.method.to_string(),
            trace.function.clone(),
            trace.len().to_string(),
            full(trace.root()),
            sci((trace.root() - exact).abs()),
        ]);
    }
    report.table(summary);

    report.paragraph(
        "Newton's error roughly squares every step, the secant error is raised to the power \
         1.618, bisection halves the interval each time.",
    );
    for (trace, exact) in traces.iter().filter(|(t, _)| t.method == "Newton" || t.method == "secant") {
        report.table(trace_table(trace, *exact));
    }

    report.paragraph("Failure modes are reported, not hidden:");
    let mut failures = Table::new("Failures", &["attempt", "outcome"]);
    let square = FunctionWithDerivative::new(|x| x * x + 1.0, |x| 2.0 * x, "x^2 + 1");
    failures.push_row(vec![
        "bisection of x^2 + 1 on [-1, 1]".to_string(),
        outcome(bisection(&square, -1.0, 1.0)),
    ]);
    failures.push_row(vec![
        "Newton on x^2 + 1 from 0".to_string(),
        outcome(newton(&square, 0.0)),
    ]);
    let runaway = ClosureFunction::new(|x| x * x + 1.0, "x^2 + 1");
    failures.push_row(vec![
        "fixed point of x^2 + 1 from 2".to_string(),
        outcome(fixed_point(&runaway, 2.0)),
    ]);
    report.table(failures);

    Ok(report)
}

fn outcome(result: Result<RootTrace, RootFindingError>) -> String {
    match result {
        Ok(trace) => format!("root {} after {} iterates", trace.root(), trace.len()),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_closure_function() {
        let func = ClosureFunction::new(|x| x * x - 4.0, "x^2 - 4");
        assert_eq!(func.evaluate(2.0), 0.0);
        assert_eq!(func.evaluate(0.0), -4.0);
        assert_eq!(func.derivative(1.0), None);
        assert_eq!(func.name(), "x^2 - 4");
    }

    #[test]
    fn test_function_with_derivative() {
        let func = FunctionWithDerivative::new(|x| x * x - 4.0, |x| 2.0 * x, "x^2 - 4");
        assert_eq!(func.derivative(3.0), Some(6.0));
    }

    #[test]
    fn test_bisection_cubic() {
        let func = ClosureFunction::new(|x| x * x * x - x - 1.0, "x^3 - x - 1");
        let trace = bisection(&func, 2.0, 1.0).unwrap();
        assert_relative_eq!(trace.root(), CUBIC_ROOT, epsilon = 1e-11);
        // interval of width 1 halved below 2e-12
        assert!(trace.len() >= 35 && trace.len() <= 45, "{} iterates", trace.len());
        assert_eq!(trace.iterates[0].x, 1.5);
    }

    #[test]
    fn test_bisection_endpoint_root_and_bad_interval() {
        let func = ClosureFunction::new(|x| x * x - 4.0, "x^2 - 4");
        let trace = bisection(&func, 2.0, 5.0).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.root(), 2.0);
        assert_eq!(
            bisection(&func, 3.0, 5.0),
            Err(RootFindingError::InvalidInterval)
        );
    }

    #[test]
    fn test_bisection_tiny_values_same_sign() {
        let func = ClosureFunction::new(|x| 1e-200 * (1.0 + x), "1e-200 (1 + x)");
        assert_eq!(bisection(&func, 0.0, 1.0), Err(RootFindingError::InvalidInterval));
        let below = ClosureFunction::new(|x| -1e-200 * (1.0 + x), "-1e-200 (1 + x)");
        assert_eq!(bisection(&below, 0.0, 1.0), Err(RootFindingError::InvalidInterval));
        // a genuine sign change of tiny values still brackets
        let tiny_line = ClosureFunction::new(|x| 1e-200 * (x - 0.25), "1e-200 (x - 1/4)");
        let trace = bisection(&tiny_line, 0.0, 1.0).unwrap();
        assert_relative_eq!(trace.root(), 0.25, epsilon = 1e-11);
    }

    #[test]
    fn test_fixed_point_cos() {
        let g = ClosureFunction::new(|x: f64| x.cos(), "cos(x)");
        let trace = fixed_point(&g, 1.0).unwrap();
        assert_relative_eq!(trace.root(), COS_ROOT, epsilon = 1e-11);
        // linear convergence is slow
        assert!(trace.len() > 50);
    }

    #[test]
    fn test_fixed_point_diverges() {
        let g = ClosureFunction::new(|x| x * x + 1.0, "x^2 + 1");
        assert!(matches!(fixed_point(&g, 2.0), Err(RootFindingError::Diverged(_))));
        let doubling = ClosureFunction::new(|x| 2.0 * x + 1.0, "2x + 1");
        assert_eq!(
            fixed_point(&doubling, 1.0),
            Err(RootFindingError::MaxIterationsReached)
        );
    }

    #[test]
    fn test_newton_cos() {
        let f = FunctionWithDerivative::new(|x: f64| x.cos() - x, |x: f64| -x.sin() - 1.0, "cos(x) - x");
        let trace = newton(&f, 1.0).unwrap();
        assert_relative_eq!(trace.root(), COS_ROOT, epsilon = 1e-15);
        assert!(trace.len() <= 8);
    }

    #[test]
    fn test_newton_failures() {
        let f = FunctionWithDerivative::new(|x| x * x + 1.0, |x| 2.0 * x, "x^2 + 1");
        assert_eq!(newton(&f, 0.0), Err(RootFindingError::DerivativeZero(0.0)));
        let no_derivative = ClosureFunction::new(|x| x - 1.0, "x - 1");
        assert_eq!(newton(&no_derivative, 0.0), Err(RootFindingError::MissingDerivative));
    }

    #[test]
    fn test_secant_cubic() {
        let f = ClosureFunction::new(|x| x * x * x - x - 1.0, "x^3 - x - 1");
        let trace = secant(&f, 1.0, 2.0).unwrap();
        assert_relative_eq!(trace.root(), CUBIC_ROOT, epsilon = 1e-12);
        assert!(trace.len() < 15);
    }

    #[test]
    fn test_secant_flat() {
        let f = ClosureFunction::new(|_| 3.0, "3");
        assert_eq!(secant(&f, 0.0, 1.0), Err(RootFindingError::DerivativeZero(1.0)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RootFindingError::MaxIterationsReached.to_string(),
            "Maximum iterations reached"
        );
        assert_eq!(
            RootFindingError::DerivativeZero(0.5).to_string(),
            "Derivative is zero at x = 0.5"
        );
    }

    #[test]
    fn test_lesson_report() {
        let report = lesson(&Settings::default()).unwrap();
        let summary = report.find_table("Iterations to converge").unwrap();
        assert_eq!(summary.rows.len(), 8);
        let failures = report.find_table("Failures").unwrap();
        assert_eq!(failures.rows[0][1], RootFindingError::InvalidInterval.to_string());
    }
}
