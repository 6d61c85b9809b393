//! Keplerian orbit segments.

use std::f64::consts;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    bodies::{Body, BodyId},
    time::UT,
};

/// Eccentricities this close to 1 are parabolic and are not evaluated.
const PARABOLIC_TOL: f64 = 1e-9;
const KEPLER_TOL: f64 = 1e-12;
const KEPLER_MAXITER: u64 = 50;
/// Mean anomaly differences below this count as already reached.
const ANOMALY_TOL: f64 = 1e-9;

fn never() -> UT {
    UT::NEVER
}

/// A Keplerian orbit, valid over the half-open window `[start, end)`.
///
/// Every query that takes a time returns `None` for times outside the
/// window or when the conic cannot be evaluated there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitSegment {
    /// The body this conic is anchored to.
    pub body: BodyId,
    /// Standard gravitational parameter of `body` (`m^3/s^2`).
    pub mu: f64,
    /// Semi-latus rectum (m).
    pub p: f64,
    /// Eccentricity (dimensionless).
    pub e: f64,
    /// Inclination (radians).
    pub i: f64,
    /// Longitude of ascending node (radians).
    pub lan: f64,
    /// Argument of periapsis (radians).
    pub argpe: f64,
    /// The epoch at true anomaly.
    pub epoch: UT,
    /// True anomaly at `epoch` (radians).
    pub ta: f64,
    /// Start of the patch.
    pub start: UT,
    /// End of the patch. [`UT::NEVER`] when the patch never transitions.
    #[serde(default = "never")]
    pub end: UT,
}

impl OrbitSegment {
    /// A segment around `body` that is valid from `epoch` onwards.
    #[allow(clippy::too_many_arguments)]
    pub fn new(body: &Body, p: f64, e: f64, i: f64, lan: f64, argpe: f64, epoch: UT, ta: f64) -> Self {
        Self {
            body: body.name.clone(),
            mu: body.mu,
            p,
            e,
            i,
            lan,
            argpe,
            epoch,
            ta,
            start: epoch,
            end: UT::NEVER,
        }
    }

    #[must_use]
    pub fn with_window(mut self, start: UT, end: UT) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn periapsis_radius(&self) -> f64 {
        self.p / (1.0 + self.e)
    }

    /// Infinite for open orbits.
    pub fn apoapsis_radius(&self) -> f64 {
        if self.is_closed() {
            self.p / (1.0 - self.e)
        } else {
            f64::INFINITY
        }
    }

    pub fn semimajor_axis(&self) -> f64 {
        self.p / (1.0 - self.e.powi(2))
    }

    pub fn is_closed(&self) -> bool {
        self.e < 1.0
    }

    pub fn period(&self) -> Option<f64> {
        if !self.is_closed() {
            return None;
        }
        let period = 2.0 * consts::PI * libm::sqrt(self.semimajor_axis().powi(3) / self.mu);
        period.is_finite().then_some(period)
    }

    /// Is `t` inside this patch's window?
    pub fn contains(&self, t: UT) -> bool {
        self.start <= t && t < self.end
    }

    pub fn overlaps(&self, other: &OrbitSegment) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The largest true anomaly reachable on this conic: π for closed
    /// orbits, the asymptote angle for open ones.
    pub fn max_true_anomaly(&self) -> f64 {
        if self.is_closed() {
            consts::PI
        } else {
            libm::acos(-1.0 / self.e)
        }
    }

    fn is_parabolic(&self) -> bool {
        (self.e - 1.0).abs() < PARABOLIC_TOL
    }

    fn mean_motion(&self) -> Option<f64> {
        if self.is_parabolic() {
            return None;
        }
        let n = libm::sqrt(self.mu / self.semimajor_axis().abs().powi(3));
        (n.is_finite() && n > 0.0).then_some(n)
    }

    pub fn mean_anomaly_at_ta(&self, ta: f64) -> Option<f64> {
        if self.is_parabolic() {
            return None;
        }
        let ta = wrap_angle(ta);
        let e = self.e;
        if self.is_closed() {
            let ea = 2.0
                * libm::atan2(
                    libm::sqrt(1.0 - e) * libm::sin(ta / 2.0),
                    libm::sqrt(1.0 + e) * libm::cos(ta / 2.0),
                );
            Some(ea - e * libm::sin(ea))
        } else {
            if 1.0 + e * libm::cos(ta) <= 0.0 {
                return None;
            }
            let ha = 2.0 * libm::atanh(libm::sqrt((e - 1.0) / (e + 1.0)) * libm::tan(ta / 2.0));
            Some(e * libm::sinh(ha) - ha)
        }
    }

    pub fn ta_at_mean_anomaly(&self, ma: f64) -> Option<f64> {
        if self.is_parabolic() || !ma.is_finite() {
            return None;
        }
        if self.is_closed() {
            let ea = ma_to_ea(wrap_angle(ma), self.e, KEPLER_TOL, KEPLER_MAXITER)?;
            Some(ea_to_ta(ea, self.e))
        } else {
            let ha = ma_to_ha(ma, self.e, KEPLER_TOL, KEPLER_MAXITER)?;
            Some(ha_to_ta(ha, self.e))
        }
    }

    fn mean_anomaly_at(&self, t: UT) -> Option<f64> {
        let n = self.mean_motion()?;
        let ma = self.mean_anomaly_at_ta(self.ta)? + n * (t - self.epoch);
        ma.is_finite().then_some(ma)
    }

    /// True anomaly at time `t`, ignoring the patch window.
    pub fn ta_at(&self, t: UT) -> Option<f64> {
        self.ta_at_mean_anomaly(self.mean_anomaly_at(t)?)
    }

    /// Calculate the position and velocity in the perifocal
    /// coordinate system PQW at the given true anomaly.
    fn sv_pqw(&self, ta: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let denom = 1.0 + self.e * libm::cos(ta);
        if denom <= f64::EPSILON {
            return None;
        }
        let r = self.p / denom;
        let rv = r * libm::cos(ta) * Vector3::new(1.0, 0.0, 0.0)
            + r * libm::sin(ta) * Vector3::new(0.0, 1.0, 0.0);
        let vv = libm::sqrt(self.mu / self.p)
            * (-libm::sin(ta) * Vector3::new(1.0, 0.0, 0.0)
                + (self.e + libm::cos(ta)) * Vector3::new(0.0, 1.0, 0.0));
        Some((rv, vv))
    }

    fn pqw_ijk_matrix(&self) -> Matrix3<f64> {
        let m11 = libm::cos(self.lan) * libm::cos(self.argpe)
            - libm::sin(self.lan) * libm::sin(self.argpe) * libm::cos(self.i);
        let m12 = -libm::cos(self.lan) * libm::sin(self.argpe)
            - libm::sin(self.lan) * libm::cos(self.argpe) * libm::cos(self.i);
        let m13 = libm::sin(self.lan) * libm::sin(self.i);
        let m21 = libm::sin(self.lan) * libm::cos(self.argpe)
            + libm::cos(self.lan) * libm::sin(self.argpe) * libm::cos(self.i);
        let m22 = -libm::sin(self.lan) * libm::sin(self.argpe)
            + libm::cos(self.lan) * libm::cos(self.argpe) * libm::cos(self.i);
        let m23 = -libm::cos(self.lan) * libm::sin(self.i);
        let m31 = libm::sin(self.argpe) * libm::sin(self.i);
        let m32 = libm::cos(self.argpe) * libm::sin(self.i);
        let m33 = libm::cos(self.i);

        Matrix3::new(m11, m12, m13, m21, m22, m23, m31, m32, m33)
    }

    /// Body-centered position and velocity at a true anomaly. `None`
    /// past the asymptotes of an open orbit.
    pub fn sv_at_ta(&self, ta: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let (rv, vv) = self.sv_pqw(ta)?;
        let mat = self.pqw_ijk_matrix();
        Some((mat * rv, mat * vv))
    }

    pub fn position_at_ta(&self, ta: f64) -> Option<Vector3<f64>> {
        self.sv_at_ta(ta).map(|(rv, _)| rv)
    }

    /// Position and velocity at `t`, ignoring the patch window.
    pub fn conic_state_at(&self, t: UT) -> Option<(Vector3<f64>, Vector3<f64>)> {
        self.sv_at_ta(self.ta_at(t)?)
    }

    /// Position and velocity at `t`; `None` outside the patch window.
    pub fn state_at(&self, t: UT) -> Option<(Vector3<f64>, Vector3<f64>)> {
        if !self.contains(t) {
            return None;
        }
        self.conic_state_at(t)
    }

    pub fn position_at(&self, t: UT) -> Option<Vector3<f64>> {
        self.state_at(t).map(|(rv, _)| rv)
    }

    pub fn velocity_at(&self, t: UT) -> Option<Vector3<f64>> {
        self.state_at(t).map(|(_, vv)| vv)
    }

    /// True anomaly of the projection of `dir` onto the orbital plane.
    pub fn ta_of_direction(&self, dir: &Vector3<f64>) -> f64 {
        let mat = self.pqw_ijk_matrix();
        libm::atan2(dir.dot(&mat.column(1)), dir.dot(&mat.column(0)))
    }

    /// Seconds from `from` until the conic next passes true anomaly
    /// `ta`. Open orbits never return to an anomaly already passed.
    pub fn time_to_ta(&self, ta: f64, from: UT) -> Option<f64> {
        let n = self.mean_motion()?;
        let dma = self.mean_anomaly_at_ta(ta)? - self.mean_anomaly_at(from)?;
        let dma = if self.is_closed() {
            let dma = dma.rem_euclid(2.0 * consts::PI);
            if 2.0 * consts::PI - dma < ANOMALY_TOL {
                0.0
            } else {
                dma
            }
        } else if dma.abs() < ANOMALY_TOL {
            0.0
        } else {
            dma
        };
        let dt = dma / n;
        (dt.is_finite() && dt >= 0.0).then_some(dt)
    }

    pub fn next_time_at_ta(&self, ta: f64, from: UT) -> Option<UT> {
        Some(from + self.time_to_ta(ta, from)?)
    }

    pub fn time_to_periapsis(&self, from: UT) -> Option<f64> {
        self.time_to_ta(0.0, from)
    }

    pub fn next_periapsis(&self, from: UT) -> Option<UT> {
        self.next_time_at_ta(0.0, from)
    }

    /// Convert a body-centered state vector into a segment valid from
    /// `time` onwards.
    ///
    /// Recommended tolerance (`tol`): `1e-8`.
    pub fn from_state_vector(
        body: &Body,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        time: UT,
        tol: f64,
    ) -> Option<Self> {
        let mu = body.mu;
        let r = position.norm();
        let hv = position.cross(&velocity);
        let h = hv.norm();
        if !(r > 0.0 && h > 0.0) {
            return None;
        }

        let ev = ((velocity.norm_squared() - mu / r) * position - position.dot(&velocity) * velocity)
            / mu;
        let p = h.powi(2) / mu;
        let hhat = hv / h;
        let i = libm::acos(hhat[2].clamp(-1.0, 1.0));

        // Equatorial orbits measure from the reference direction.
        let nv = Vector3::new(0.0, 0.0, 1.0).cross(&hv);
        let (lan, nhat) = if nv.norm() < tol * h {
            (0.0, Vector3::new(1.0, 0.0, 0.0))
        } else {
            let nhat = nv.normalize();
            (libm::atan2(nhat[1], nhat[0]), nhat)
        };
        let mhat = hhat.cross(&nhat);

        // Argument of latitude
        let u = libm::atan2(position.dot(&mhat), position.dot(&nhat));
        let (e, argpe) = if ev.norm() < tol {
            (0.0, 0.0)
        } else {
            (ev.norm(), libm::atan2(ev.dot(&mhat), ev.dot(&nhat)))
        };

        let segment = OrbitSegment {
            body: body.name.clone(),
            mu,
            p,
            e,
            i,
            lan,
            argpe,
            epoch: time,
            ta: wrap_angle(u - argpe),
            start: time,
            end: UT::NEVER,
        };
        [p, e, i, lan, argpe, segment.ta]
            .iter()
            .all(|x| x.is_finite())
            .then_some(segment)
    }
}

/// Wrap an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + consts::PI).rem_euclid(2.0 * consts::PI) - consts::PI
}

pub fn ea_to_ta(ea: f64, e: f64) -> f64 {
    let beta = e / (1.0 + libm::sqrt(1.0 - e.powi(2)));
    ea + 2.0 * libm::atan2(beta * libm::sin(ea), 1.0 - beta * libm::cos(ea))
}

pub fn ha_to_ta(ha: f64, e: f64) -> f64 {
    2.0 * libm::atan(libm::sqrt((e + 1.0) / (e - 1.0)) * libm::tanh(ha / 2.0))
}

pub fn ma_to_ea(ma: f64, e: f64, tol: f64, maxiter: u64) -> Option<f64> {
    if !(0.0..1.0).contains(&e) {
        return None;
    }

    let mut ea_new = if -consts::PI < ma && ma < 0.0 || ma > consts::PI {
        ma - e
    } else {
        ma + e
    };

    let mut ea;
    let mut iter = 0;
    while iter < maxiter {
        ea = ea_new;
        ea_new = ea + (ma - ea + e * libm::sin(ea)) / (1.0 - e * libm::cos(ea));

        if (ea_new - ea).abs() < tol {
            return Some(ea_new);
        }

        iter += 1;
    }
    None
}

pub fn ma_to_ha(ma: f64, e: f64, tol: f64, maxiter: u64) -> Option<f64> {
    if e <= 1.0 {
        return None;
    }

    let mut ha_new = libm::asinh(ma / e);

    let mut ha;
    let mut iter = 0;
    while iter < maxiter {
        ha = ha_new;
        ha_new = ha - (e * libm::sinh(ha) - ha - ma) / (e * libm::cosh(ha) - 1.0);

        if !ha_new.is_finite() {
            return None;
        }
        if (ha_new - ha).abs() < tol * ha.abs().max(1.0) {
            return Some(ha_new);
        }

        iter += 1;
    }
    None
}
