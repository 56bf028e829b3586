//! IEEE 754 double precision: how a number is stored, what the extremes are, and where
//! round-off bites.
//!
//! A double is 64 bits: 1 sign bit `s`, an 11 bit characteristic `c` (the exponent with a
//! bias of 1023) and a 52 bit mantissa `m`. For a normal number
//!
//! ```text
//! x = (-1)^s * 2^(c - 1023) * (1 + m / 2^52)
//! ```
//!
//! `c = 0` encodes zero and the subnormals (`2^-1022 * m / 2^52`), `c = 2047` encodes
//! infinities (`m = 0`) and NaN (`m != 0`).
//!
//! # Example
//! ```
//! use RustedNumLessons::lessons::floating_point::{decompose, largest_double};
//! let parts = decompose(-2.5);
//! assert_eq!(parts.sign, 1);
//! assert_eq!(parts.exponent(), 1);
//! assert_eq!(largest_double(), f64::MAX);
//! ```
use crate::lessons::{LessonError, Report, Table, full, sci};
use crate::settings::Settings;
use log::debug;

pub const EXPONENT_BIAS: i32 = 1023;
pub const MANTISSA_BITS: u32 = 52;
const MANTISSA_MASK: u64 = (1u64 << MANTISSA_BITS) - 1;
const CHARACTERISTIC_MASK: u64 = 0x7ff;

/// The three fields of a double
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatParts {
    pub sign: u8,
    pub characteristic: u16,
    pub mantissa: u64,
}

impl FloatParts {
    /// Unbiased exponent. Subnormals share the exponent of the smallest normal number.
    pub fn exponent(&self) -> i32 {
        if self.characteristic == 0 {
            1 - EXPONENT_BIAS
        } else {
            self.characteristic as i32 - EXPONENT_BIAS
        }
    }

    pub fn is_subnormal(&self) -> bool {
        self.characteristic == 0 && self.mantissa != 0
    }

    pub fn to_bits(&self) -> u64 {
        ((self.sign as u64 & 1) << 63)
            | ((self.characteristic as u64 & CHARACTERISTIC_MASK) << MANTISSA_BITS)
            | (self.mantissa & MANTISSA_MASK)
    }

    /// The stored value, reassembled from the bit fields
    pub fn value(&self) -> f64 {
        f64::from_bits(self.to_bits())
    }

    /// The stored value evaluated from the textbook formula; `None` for infinities and NaN.
    pub fn formula_value(&self) -> Option<f64> {
        if self.characteristic as u64 == CHARACTERISTIC_MASK {
            return None;
        }
        let sign = if self.sign == 1 { -1.0 } else { 1.0 };
        let fraction = self.mantissa as f64 / 2f64.powi(MANTISSA_BITS as i32);
        let significand = if self.characteristic == 0 {
            fraction
        } else {
            1.0 + fraction
        };
        Some(sign * 2f64.powi(self.exponent()) * significand)
    }
}

pub fn decompose(x: f64) -> FloatParts {
    let bits = x.to_bits();
    FloatParts {
        sign: (bits >> 63) as u8,
        characteristic: ((bits >> MANTISSA_BITS) & CHARACTERISTIC_MASK) as u16,
        mantissa: bits & MANTISSA_MASK,
    }
}

/// `"s eeeeeeeeeee mmmm..."` with the three fields separated by spaces
pub fn bit_string(x: f64) -> String {
    let parts = decompose(x);
    format!(
        "{} {:011b} {:052b}",
        parts.sign, parts.characteristic, parts.mantissa
    )
}

/// 2^1023 * (2 - 2^-52): largest characteristic short of the reserved one, all mantissa bits set
pub fn largest_double() -> f64 {
    2f64.powi(1023) * (2.0 - 2f64.powi(-52))
}

/// 2^-1022
pub fn smallest_normal() -> f64 {
    2f64.powi(1 - EXPONENT_BIAS)
}

/// 2^-1074, a single set mantissa bit with a zero characteristic.
/// 2^1074 itself overflows, so the power is taken in two steps.
pub fn smallest_subnormal() -> f64 {
    smallest_normal() * 2f64.powi(-(MANTISSA_BITS as i32))
}

/// Halves `eps` until `1 + eps/2` rounds back to 1
pub fn machine_epsilon() -> f64 {
    let mut eps = 1.0f64;
    while 1.0 + eps / 2.0 > 1.0 {
        eps /= 2.0;
    }
    eps
}

/// Distance from |x| to the next larger double (to the next smaller one at `f64::MAX`).
/// NaN for non-finite input.
pub fn ulp(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    let a = x.abs();
    if a == f64::MAX {
        return a - f64::from_bits(a.to_bits() - 1);
    }
    f64::from_bits(a.to_bits() + 1) - a
}

/// Compensated (Kahan) summation
pub fn kahan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for x in values {
        let y = x - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CancellationRow {
    pub x: f64,
    pub naive: f64,
    pub stable: f64,
    pub relative_error: f64,
}

fn relative_error(approx: f64, exact: f64) -> f64 {
    ((approx - exact) / exact).abs()
}

/// `(x + 1/x) - x` against `1/x`. Once 1/x drops below half an ulp of x the addition
/// returns x unchanged and the difference is exactly zero.
pub fn cancellation_table(xs: &[f64]) -> Vec<CancellationRow> {
    xs.iter()
        .map(|&x| {
            let naive = (x + 1.0 / x) - x;
            let stable = 1.0 / x;
            CancellationRow {
                x,
                naive,
                stable,
                relative_error: relative_error(naive, stable),
            }
        })
        .collect()
}

/// `sqrt(x+1) - sqrt(x)` against the rationalized `1 / (sqrt(x+1) + sqrt(x))`
pub fn sqrt_difference_table(xs: &[f64]) -> Vec<CancellationRow> {
    xs.iter()
        .map(|&x| {
            let naive = (x + 1.0).sqrt() - x.sqrt();
            let stable = 1.0 / ((x + 1.0).sqrt() + x.sqrt());
            CancellationRow {
                x,
                naive,
                stable,
                relative_error: relative_error(naive, stable),
            }
        })
        .collect()
}

/// Roots of ax^2 + bx + c by the schoolbook formula, ascending. `None` for complex roots.
pub fn quadratic_roots_naive(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let s = discriminant.sqrt();
    let r1 = (-b + s) / (2.0 * a);
    let r2 = (-b - s) / (2.0 * a);
    Some((r1.min(r2), r1.max(r2)))
}

/// Same roots, avoiding the subtraction of nearly equal numbers: q = -(b + sign(b) sqrt(D)) / 2,
/// roots q/a and c/q. Ascending, `None` for complex roots.
pub fn quadratic_roots_stable(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    if q == 0.0 {
        // b = c = 0
        return Some((0.0, 0.0));
    }
    let r1 = q / a;
    let r2 = c / q;
    Some((r1.min(r2), r1.max(r2)))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummationDemo {
    pub n: usize,
    pub naive: f64,
    pub kahan: f64,
    pub exact: f64,
}

/// Adds 0.1 to itself n times, plainly and with compensation
pub fn summation_demo(n: usize) -> SummationDemo {
    let mut naive = 0.0;
    for _ in 0..n {
        naive += 0.1;
    }
    let kahan = kahan_sum(std::iter::repeat_n(0.1, n));
    SummationDemo {
        n,
        naive,
        kahan,
        exact: n as f64 / 10.0,
    }
}

fn layout_row(label: &str, x: f64) -> Vec<String> {
    let parts = decompose(x);
    vec![
        label.to_string(),
        full(x),
        parts.sign.to_string(),
        parts.characteristic.to_string(),
        parts.exponent().to_string(),
        format!("{:#015x}", parts.mantissa),
        bit_string(x),
    ]
}

fn cancellation_rows(name: &str, naive_header: &str, stable_header: &str, rows: &[CancellationRow]) -> Table {
    let mut table = Table::new(name, &["x", naive_header, stable_header, "relative error"]);
    for row in rows {
        table.push_row(vec![
            sci(row.x),
            full(row.naive),
            full(row.stable),
            sci(row.relative_error),
        ]);
    }
    table
}

pub fn lesson(_settings: &Settings) -> Result<Report, LessonError> {
    let mut report = Report::new("Floating point arithmetic");
    report.paragraph(
        "A double is stored as a sign bit, an 11 bit characteristic c (exponent biased by 1023) \
         and a 52 bit mantissa m: x = (-1)^s * 2^(c-1023) * (1 + m/2^52).",
    );

    let mut layout = Table::new(
        "IEEE 754 layout",
        &["name", "value", "sign", "characteristic", "exponent", "mantissa", "bits"],
    );
    for (label, x) in [
        ("one", 1.0),
        ("minus two and a half", -2.5),
        ("one tenth", 0.1),
        ("largest double", largest_double()),
        ("smallest normal", smallest_normal()),
        ("smallest subnormal", smallest_subnormal()),
    ] {
        layout.push_row(layout_row(label, x));
    }
    report.table(layout);

    let eps = machine_epsilon();
    let mut limits = Table::new("Limits", &["quantity", "formula", "computed", "library constant"]);
    limits.push_row(vec![
        "largest double".to_string(),
        "2^1023 (2 - 2^-52)".to_string(),
        full(largest_double()),
        full(f64::MAX),
    ]);
    limits.push_row(vec![
        "smallest normal".to_string(),
        "2^-1022".to_string(),
        full(smallest_normal()),
        full(f64::MIN_POSITIVE),
    ]);
    limits.push_row(vec![
        "smallest subnormal".to_string(),
        "2^-1074".to_string(),
        full(smallest_subnormal()),
        full(f64::from_bits(1)),
    ]);
    limits.push_row(vec![
        "machine epsilon".to_string(),
        "halve while 1 + eps/2 > 1".to_string(),
        full(eps),
        full(f64::EPSILON),
    ]);
    report.table(limits);
    debug!("machine epsilon found: {:e}", eps);

    report.paragraph(
        "Nothing traps: overflow gives infinity, 0/0 gives NaN, and NaN compares unequal to itself.",
    );
    let big = largest_double();
    let nan = 0.0f64 / 0.0;
    let mut special = Table::new("Special values", &["expression", "result"]);
    special.push_row(vec!["largest * 2".to_string(), (big * 2.0).to_string()]);
    special.push_row(vec!["largest + 1".to_string(), full(big + 1.0)]);
    special.push_row(vec!["1 / 0".to_string(), (1.0f64 / 0.0).to_string()]);
    special.push_row(vec!["-1 / 0".to_string(), (-1.0f64 / 0.0).to_string()]);
    special.push_row(vec!["0 / 0".to_string(), nan.to_string()]);
    special.push_row(vec!["NaN == NaN".to_string(), (nan == nan).to_string()]);
    special.push_row(vec!["smallest subnormal / 2".to_string(), (smallest_subnormal() / 2.0).to_string()]);
    report.table(special);

    let sum = 0.1 + 0.2;
    let mut decimal = Table::new("Decimal fractions", &["expression", "result"]);
    decimal.push_row(vec!["0.1 + 0.2".to_string(), full(sum)]);
    decimal.push_row(vec!["0.3".to_string(), full(0.3)]);
    decimal.push_row(vec!["0.1 + 0.2 == 0.3".to_string(), (sum == 0.3).to_string()]);
    decimal.push_row(vec!["(0.1 + 0.2) - 0.3".to_string(), sci(sum - 0.3)]);
    decimal.push_row(vec!["ulp(0.3)".to_string(), sci(ulp(0.3))]);
    report.table(decimal);

    report.paragraph(
        "Cancellation: (x + 1/x) - x equals 1/x exactly, but once 1/x is smaller than half \
         the spacing of doubles near x, the sum rounds back to x and the result is 0.",
    );
    let xs: Vec<f64> = (0..=10).map(|k| 10f64.powi(k)).collect();
    report.table(cancellation_rows(
        "x + 1/x - x",
        "(x + 1/x) - x",
        "1/x",
        &cancellation_table(&xs),
    ));

    let xs: Vec<f64> = (0..=8).map(|k| 10f64.powi(2 * k)).collect();
    report.table(cancellation_rows(
        "sqrt(x+1) - sqrt(x)",
        "sqrt(x+1) - sqrt(x)",
        "1/(sqrt(x+1) + sqrt(x))",
        &sqrt_difference_table(&xs),
    ));

    report.paragraph("Quadratic x^2 + 1e8 x + 1 = 0: the small root is about -1e-8.");
    let mut quadratic = Table::new("Quadratic roots", &["formula", "large root", "small root"]);
    if let Some((large, small)) = quadratic_roots_naive(1.0, 1e8, 1.0) {
        quadratic.push_row(vec!["(-b +- sqrt(D)) / 2a".to_string(), full(large), full(small)]);
    }
    if let Some((large, small)) = quadratic_roots_stable(1.0, 1e8, 1.0) {
        quadratic.push_row(vec!["q/a, c/q".to_string(), full(large), full(small)]);
    }
    report.table(quadratic);

    let mut summation = Table::new("Summing 0.1", &["n", "naive", "Kahan", "n/10", "naive error", "Kahan error"]);
    for n in [10, 1_000, 100_000, 1_000_000] {
        let demo = summation_demo(n);
        summation.push_row(vec![
            n.to_string(),
            full(demo.naive),
            full(demo.kahan),
            full(demo.exact),
            sci((demo.naive - demo.exact).abs()),
            sci((demo.kahan - demo.exact).abs()),
        ]);
    }
    report.table(summation);

    Ok(report)
}
