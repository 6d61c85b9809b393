//! Closest points between two conics.
//!
//! The separation between a point on `a` and the point of `b` in the
//! same direction is scanned once around `a` at a fixed resolution,
//! then the (at most two) deepest local minima are refined with a
//! golden-section search. Both stages are bounded, so the cost of a
//! search is fixed regardless of the geometry.

use std::f64::consts;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::trace;

use super::orbits::{wrap_angle, OrbitSegment};

const INVPHI: f64 = 0.618_033_988_749_895;

/// Keeps the scan of an open conic away from its asymptotes.
const ASYMPTOTE_MARGIN: f64 = 1e-3;

/// Relative rounding noise tolerated when comparing scan samples.
const NOISE: f64 = 1e-9;

fn clearly_below(d: f64, other: f64) -> bool {
    other == f64::INFINITY || d < other - NOISE * other.max(1.0)
}

/// Separation between the point of `a` at true anomaly `ta` and the
/// point of `b` in the same direction. Infinite where either conic is
/// undefined.
fn separation(a: &OrbitSegment, b: &OrbitSegment, ta: f64) -> f64 {
    let Some(ra) = a.position_at_ta(ta) else {
        return f64::INFINITY;
    };
    let Some(rb) = b.position_at_ta(b.ta_of_direction(&ra)) else {
        return f64::INFINITY;
    };
    let d = (ra - rb).norm();
    if d.is_finite() {
        d
    } else {
        f64::INFINITY
    }
}

fn golden_section(
    f: impl Fn(f64) -> f64,
    mut lo: f64,
    mut hi: f64,
    tol: f64,
    maxiter: u64,
) -> f64 {
    let mut c = hi - INVPHI * (hi - lo);
    let mut d = lo + INVPHI * (hi - lo);
    let mut fc = f(c);
    let mut fd = f(d);

    let mut iter = 0;
    while iter < maxiter && hi - lo > tol {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INVPHI * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INVPHI * (hi - lo);
            fd = f(d);
        }
        iter += 1;
    }
    trace!(iter, width = hi - lo, "golden section finished");

    (lo + hi) / 2.0
}

/// Find up to two true anomalies on `a` where it passes closest to
/// `b`, deepest first.
///
/// `samples` sets the resolution of the initial scan; `tol` (radians)
/// and `maxiter` bound the refinement of each candidate. Candidates
/// that refine to within `tol` of each other are reported once.
///
/// When the separation is the same all the way around (coincident or
/// concentric conics), `seed`, the anomaly of `a` where the search
/// starts, is the only candidate.
pub fn closest_points(
    a: &OrbitSegment,
    b: &OrbitSegment,
    seed: f64,
    samples: usize,
    tol: f64,
    maxiter: u64,
) -> Vec<f64> {
    let samples = samples.max(8);
    let closed = a.is_closed();
    let (limit, step) = if closed {
        (consts::PI, 2.0 * consts::PI / samples as f64)
    } else {
        let limit = a.max_true_anomaly() * (1.0 - ASYMPTOTE_MARGIN);
        (limit, 2.0 * limit / (samples - 1) as f64)
    };

    let scan = (0..samples)
        .map(|k| {
            let ta = -limit + step * k as f64;
            (ta, separation(a, b, ta))
        })
        .collect::<Vec<_>>();

    let neighbour = |k: usize, forward: bool| -> Option<f64> {
        let j = match (forward, closed) {
            (true, true) => (k + 1) % samples,
            (false, true) => (k + samples - 1) % samples,
            (true, false) => k.checked_add(1).filter(|&j| j < samples)?,
            (false, false) => k.checked_sub(1)?,
        };
        Some(scan[j].1)
    };

    let minima = scan
        .iter()
        .enumerate()
        .filter(|(k, (_, d))| {
            d.is_finite()
                && neighbour(*k, false).map_or(true, |prev| clearly_below(*d, prev))
                && neighbour(*k, true).map_or(true, |next| !clearly_below(next, *d))
        })
        .map(|(_, &(ta, d))| (ta, d))
        .sorted_by_key(|&(_, d)| OrderedFloat(d))
        .take(2)
        .collect::<Vec<_>>();

    if minima.is_empty() {
        let depth = separation(a, b, seed);
        trace!(seed, depth, "flat separation profile");
        return if depth.is_finite() {
            vec![wrap_angle(seed)]
        } else {
            Vec::new()
        };
    }

    let mut candidates: Vec<f64> = Vec::with_capacity(2);
    for (seed, depth) in minima {
        let (mut lo, mut hi) = (seed - step, seed + step);
        if !closed {
            lo = lo.max(-limit);
            hi = hi.min(limit);
        }
        let ta = wrap_angle(golden_section(|ta| separation(a, b, ta), lo, hi, tol, maxiter));
        trace!(seed, depth, ta, "refined closest point");
        if candidates
            .iter()
            .all(|other| wrap_angle(ta - other).abs() > tol)
        {
            candidates.push(ta);
        }
    }
    candidates
}
