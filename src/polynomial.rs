//! Single-variable polynomials and the (associated) Legendre functions built from them.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::trace;

/// A polynomial with real coefficients, where `c[i]` is the coefficient of x^i.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polynomial {
    c: Vec<f64>,
}

impl Polynomial {
    /// e.g. for x^2-1, use `Polynomial::new(vec![-1.0, 0.0, 1.0])`
    pub fn new(c: Vec<f64>) -> Self {
        Polynomial { c }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.c
    }

    pub fn degree(&self) -> usize {
        self.c.len().saturating_sub(1)
    }

    /// Horner evaluation at x.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.c.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn derivative(&self) -> Polynomial {
        let c = self
            .c
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| i as f64 * c)
            .collect();
        Polynomial { c }
    }
}

/// x^n for any integer n, computed by repeated squaring.
/// n = 0 yields 1 for every x, including 0.
pub fn pow(x: f64, n: i32) -> f64 {
    let mut base = if n < 0 { 1.0 / x } else { x };
    let mut e = n.unsigned_abs();
    let mut acc = 1.0;
    while e > 0 {
        if e & 1 == 1 {
            acc *= base;
        }
        base *= base;
        e >>= 1;
    }
    acc
}

/// Exact n!, or `None` once the result no longer fits into a u64 (n > 20).
pub fn factorial(n: u32) -> Option<u64> {
    (2..=n as u64).try_fold(1u64, |acc, k| acc.checked_mul(k))
}

/// Exact n!/m! for n >= m without computing either factorial.
/// `None` if m > n (not an integer) or on overflow.
pub fn factorial_ratio(n: u32, m: u32) -> Option<u64> {
    if m > n {
        return None;
    }
    (m as u64 + 1..=n as u64).try_fold(1u64, |acc, k| acc.checked_mul(k))
}

/// n!/m! as a float, valid well beyond the range of the exact integer version.
pub fn factorial_ratio_float(n: u32, m: u32) -> f64 {
    if m > n {
        return 1.0 / factorial_ratio_float(m, n);
    }
    (m + 1..=n).fold(1.0, |acc, k| acc * k as f64)
}

fn binomial(n: u32, k: u32) -> f64 {
    factorial_ratio_float(n, n - k) / factorial_ratio_float(k, 0)
}

/// The ordinary Legendre polynomial of degree n, uncached.
pub fn legendre(n: usize) -> Polynomial {
    let nn = n as u32;
    let scale = pow(2.0, -(nn as i32));
    let mut c = vec![0.0; n + 1];
    for k in 0..=nn / 2 {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        c[(nn - 2 * k) as usize] = sign * binomial(nn, k) * binomial(2 * nn - 2 * k, nn) * scale;
    }
    Polynomial::new(c)
}

/// Schmidt semi-normalized associated Legendre function P̆(n,m) of sin(φ′),
/// together with its derivative with respect to the latitude φ′.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociatedLegendre {
    pub p: f64,
    pub dp: f64,
    /// P̆(n,m)/cos(φ′), only defined for m > 0 (stays finite at the poles)
    pub p_over_cos: f64,
}

/// Memo of Legendre polynomials and their derivatives, keyed by (degree, derivative order).
///
/// Entries are only ever added. The table is bounded by the harmonic degree of the
/// model it serves, so nothing is evicted.
#[derive(Debug, Default)]
pub struct LegendreTable {
    cache: RwLock<HashMap<(usize, usize), Polynomial>>,
}

impl LegendreTable {
    pub fn new() -> Self {
        LegendreTable::default()
    }

    /// Memoized ordinary Legendre polynomial of degree n.
    pub fn polynomial(&self, n: usize) -> Polynomial {
        self.derivative(n, 0)
    }

    /// The m-th derivative of the Legendre polynomial of degree n.
    pub fn derivative(&self, n: usize, m: usize) -> Polynomial {
        if let Some(p) = self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&(n, m)) {
            return p.clone();
        }
        trace!(n, m, "legendre cache miss");
        let p = if m == 0 { legendre(n) } else { self.derivative(n, m - 1).derivative() };
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((n, m))
            .or_insert(p)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// P̆(n,m)(μ) with μ = sin(φ′), where P(n,m)(μ) = (1-μ²)^(m/2) dᵐ/dμᵐ Pₙ(μ)
    /// without Condon-Shortley phase and with the Schmidt factor sqrt(2 (n-m)!/(n+m)!) for m > 0.
    pub fn associated(&self, n: usize, m: usize, mu: f64) -> AssociatedLegendre {
        let schmidt = schmidt_factor(n, m);
        let cos = (1.0 - mu * mu).max(0.0).sqrt();
        let q = self.derivative(n, m).evaluate(mu);
        let dq = self.derivative(n, m + 1).evaluate(mu);
        let mi = m as i32;

        let p = schmidt * pow(cos, mi) * q;
        let mut dp = schmidt * pow(cos, mi + 1) * dq;
        let mut p_over_cos = 0.0;
        if m > 0 {
            let reduced = schmidt * pow(cos, mi - 1) * q;
            dp -= m as f64 * mu * reduced;
            p_over_cos = reduced;
        }
        AssociatedLegendre { p, dp, p_over_cos }
    }
}

pub fn schmidt_factor(n: usize, m: usize) -> f64 {
    if m == 0 {
        1.0
    } else {
        (2.0 / factorial_ratio_float((n + m) as u32, (n - m) as u32)).sqrt()
    }
}
