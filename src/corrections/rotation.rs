//! Two-step coordinate rotation of sonic wind and covariances.
//!
//! The sonic measures in instrument axes. Rotating into the mean-flow frame
//! first turns about the vertical axis by the yaw `η` so the mean cross-wind
//! vanishes, then about the new cross-wind axis by the pitch `θ` so the mean
//! vertical wind vanishes:
//!
//! ```text
//! M = Ry(θ)·Rz(η) = | cθ·cη   cθ·sη   sθ |
//!                   |  −sη      cη     0  |
//!                   | −sθ·cη  −sθ·sη   cθ |
//! ```
//!
//! Scalar covariances `(u'x', v'x', w'x')` rotate with the same matrix; only
//! the vertical component `w'x'` is kept. Momentum covariances use the
//! corresponding combinations of the raw (co)variances.
//!
//! # Example
//!
//! ```
//! use fluxqc::corrections::RotationMatrix;
//!
//! let r = RotationMatrix::from_wind(1.0, 0.0, 0.0);
//! assert_eq!(r.eta(), 0.0);
//! assert_eq!(r.theta(), 0.0);
//! assert_eq!(r.rotate([1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]);
//! ```

use tracing::{debug, warn};

use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::pipeline::traits::owned;
use crate::series::{Dataset, DatasetError, NewSeries, names};
use crate::types::FlagCode;

// =============================================================================
// Rotation matrix
// =============================================================================

/// Sines and cosines of the yaw and pitch angles for one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationMatrix {
    ce: f64,
    se: f64,
    ct: f64,
    st: f64,
}

impl RotationMatrix {
    /// Angles that align the mean wind `(ux, uy, uz)` with the x axis.
    ///
    /// Zero horizontal wind speed leaves the yaw undefined and every factor
    /// becomes `NaN`.
    pub fn from_wind(ux: f64, uy: f64, uz: f64) -> Self {
        let ws2d = (ux * ux + uy * uy).sqrt();
        let ws3d = (ux * ux + uy * uy + uz * uz).sqrt();
        let (ce, se) = if ws2d > 0.0 {
            (ux / ws2d, uy / ws2d)
        } else {
            (f64::NAN, f64::NAN)
        };
        Self {
            ce,
            se,
            ct: ws2d / ws3d,
            st: uz / ws3d,
        }
    }

    /// Rotation from yaw and pitch in degrees.
    pub fn from_angles(eta_deg: f64, theta_deg: f64) -> Self {
        let (se, ce) = eta_deg.to_radians().sin_cos();
        let (st, ct) = theta_deg.to_radians().sin_cos();
        Self { ce, se, ct, st }
    }

    /// Yaw angle in degrees.
    pub fn eta(&self) -> f64 {
        self.se.atan2(self.ce).to_degrees()
    }

    /// Pitch angle in degrees.
    pub fn theta(&self) -> f64 {
        self.st.atan2(self.ct).to_degrees()
    }

    /// True if all factors are finite.
    pub fn is_valid(&self) -> bool {
        self.ce.is_finite() && self.se.is_finite() && self.ct.is_finite() && self.st.is_finite()
    }

    /// Yaw about the vertical axis.
    #[inline]
    fn yaw(v: [f64; 3], ce: f64, se: f64) -> [f64; 3] {
        [v[0] * ce + v[1] * se, v[1] * ce - v[0] * se, v[2]]
    }

    /// Pitch about the cross-wind axis.
    #[inline]
    fn pitch(v: [f64; 3], ct: f64, st: f64) -> [f64; 3] {
        [v[0] * ct + v[2] * st, v[1], v[2] * ct - v[0] * st]
    }

    /// Rotate a vector from instrument to mean-flow axes.
    pub fn rotate(&self, v: [f64; 3]) -> [f64; 3] {
        Self::pitch(Self::yaw(v, self.ce, self.se), self.ct, self.st)
    }

    /// Undo [`rotate`](Self::rotate): negated angles applied in reverse order.
    pub fn inverse_rotate(&self, v: [f64; 3]) -> [f64; 3] {
        Self::yaw(Self::pitch(v, self.ct, -self.st), self.ce, -self.se)
    }

    /// Vertical component of a rotated scalar covariance `(u'x', v'x', w'x')`.
    #[inline]
    pub fn scalar_flux(&self, cov: [f64; 3]) -> f64 {
        cov[2] * self.ct - cov[0] * self.st * self.ce - cov[1] * self.st * self.se
    }

    /// Rotated momentum covariances `(u'w', v'w')`.
    #[inline]
    pub fn momentum_flux(&self, uxuz: f64, uyuz: f64, uxuy: f64, uxux: f64, uyuy: f64) -> (f64, f64) {
        let uw = uxuz * self.ct - uxux * self.st * self.ce - uxuy * self.st * self.se;
        let vw = uyuz * self.ct - uxuy * self.st * self.ce - uyuy * self.st * self.se;
        (uw, vw)
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Scalar covariance triplets rotated when present, with their output names.
const SCALARS: [([&str; 3], &str); 3] = [
    ([names::UXT, names::UYT, names::UZT], names::WT),
    ([names::UXA, names::UYA, names::UZA], names::WA),
    ([names::UXC, names::UYC, names::UZC], names::WC),
];

const WIND: [&str; 3] = [names::UX, names::UY, names::UZ];

const MOMENTUM: [&str; 5] = [names::UXUZ, names::UYUZ, names::UXUY, names::UXUX, names::UYUY];

/// Two-step coordinate rotation.
///
/// Heat covariances are required; humidity and CO₂ triplets are rotated
/// when present.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoordinateRotation;

impl CoordinateRotation {
    fn matrices(ds: &Dataset) -> Result<Vec<RotationMatrix>, DatasetError> {
        let ux = ds.require(names::UX)?.masked();
        let uy = ds.require(names::UY)?.masked();
        let uz = ds.require(names::UZ)?.masked();
        Ok((0..ds.len())
            .map(|i| RotationMatrix::from_wind(ux[i], uy[i], uz[i]))
            .collect())
    }
}

impl Transform for CoordinateRotation {
    fn name(&self) -> &'static str {
        "CoordinateRotation"
    }

    fn description(&self) -> &str {
        "Two-step (yaw, pitch) rotation into mean-flow axes"
    }

    fn requires(&self) -> Vec<String> {
        let mut req = owned(&WIND);
        req.extend(owned(&MOMENTUM));
        req.extend(owned(&SCALARS[0].0));
        req
    }

    fn produces(&self) -> Vec<String> {
        owned(&[
            names::ETA,
            names::THETA,
            names::U,
            names::V,
            names::W,
            names::UW,
            names::VW,
            names::WT,
            names::WA,
            names::WC,
        ])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let n = ds.len();
        let rot = Self::matrices(ds)?;
        let ux = ds.require(names::UX)?.masked();
        let uy = ds.require(names::UY)?.masked();
        let uz = ds.require(names::UZ)?.masked();

        let mut masked = 0;
        let mut outputs = Vec::new();

        // Angles and mean wind
        let eta: Vec<f64> = rot.iter().map(|r| r.eta()).collect();
        let theta: Vec<f64> = rot.iter().map(|r| r.theta()).collect();
        let mut u = vec![f64::NAN; n];
        let mut v = vec![f64::NAN; n];
        let mut w = vec![f64::NAN; n];
        for i in 0..n {
            if rot[i].is_valid() {
                [u[i], v[i], w[i]] = rot[i].rotate([ux[i], uy[i], uz[i]]);
            }
        }
        for (name, data, units) in [
            (names::ETA, eta, "deg"),
            (names::THETA, theta, "deg"),
            (names::U, u, "m/s"),
            (names::V, v, "m/s"),
            (names::W, w, "m/s"),
        ] {
            masked += ds.create(
                NewSeries::new(name, data)
                    .with_inputs(&WIND)
                    .merge_input_flags()
                    .with_mask_code(FlagCode::RotationMasked)
                    .with_units(units)
                    .with_description("Rotated to mean-flow axes"),
            )?;
            outputs.push(name);
        }

        // Momentum covariances
        let m: Vec<Vec<f64>> = MOMENTUM
            .iter()
            .map(|name| ds.require(name).map(|s| s.masked()))
            .collect::<Result<_, _>>()?;
        let mut uw = vec![f64::NAN; n];
        let mut vw = vec![f64::NAN; n];
        for i in 0..n {
            (uw[i], vw[i]) = rot[i].momentum_flux(m[0][i], m[1][i], m[2][i], m[3][i], m[4][i]);
        }
        let mut inputs: Vec<&str> = WIND.to_vec();
        inputs.extend(MOMENTUM);
        for (name, data) in [(names::UW, uw), (names::VW, vw)] {
            masked += ds.create(
                NewSeries::new(name, data)
                    .with_inputs(&inputs)
                    .merge_input_flags()
                    .with_mask_code(FlagCode::RotationMasked)
                    .with_units("m2/s2")
                    .with_description("Rotated momentum covariance"),
            )?;
            outputs.push(name);
        }

        // Scalar covariances
        for (triplet, out) in SCALARS {
            if let Some(absent) = triplet.iter().find(|name| !ds.contains(name)) {
                warn!(series = out, missing = %absent, "scalar covariance not rotated: input absent");
                continue;
            }
            let c: Vec<Vec<f64>> = triplet
                .iter()
                .map(|name| ds.require(name).map(|s| s.masked()))
                .collect::<Result<_, _>>()?;
            let data: Vec<f64> = (0..n)
                .map(|i| rot[i].scalar_flux([c[0][i], c[1][i], c[2][i]]))
                .collect();
            let mut inputs: Vec<&str> = WIND.to_vec();
            inputs.extend(triplet);
            masked += ds.create(
                NewSeries::new(out, data)
                    .with_inputs(&inputs)
                    .merge_input_flags()
                    .with_mask_code(FlagCode::RotationMasked)
                    .with_description("Rotated scalar covariance"),
            )?;
            outputs.push(out);
        }

        debug!(masked, "coordinate rotation complete");
        Ok(TransformOutcome::applied(&outputs, masked))
    }
}
