//! Friction velocity from surface-layer similarity.
//!
//! An independent `u*` for periods when the sonic covariances are unusable
//! but the sensible heat flux and mean wind speed are not, e.g. to gap fill
//! `ustar` or to cross-check it. Needs the site's measurement height above
//! the displacement height and its roughness length.

use tracing::debug;

use crate::config::{ConfigError, MetInputs, SurfaceLayerConfig};
use crate::physics::meteorology as mf;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, NewSeries, names};
use crate::types::FlagCode;

use super::pointwise;

/// `u*` solved from `Fh` and wind speed with Businger-Dyer profiles.
#[derive(Clone, Debug)]
pub struct UstarFromHeatFlux {
    met: MetInputs,
    wind_speed: String,
    zmd: f64,
    z0: f64,
}

impl UstarFromHeatFlux {
    /// # Errors
    /// If either height is missing or `0 < z0 < zmd` fails.
    pub fn new(met: MetInputs, surface: &SurfaceLayerConfig) -> Result<Self, ConfigError> {
        let (zmd, z0) = surface.parameters()?;
        Ok(Self {
            met,
            wind_speed: surface.wind_speed.clone(),
            zmd,
            z0,
        })
    }
}

impl Transform for UstarFromHeatFlux {
    fn name(&self) -> &'static str {
        "UstarFromHeatFlux"
    }

    fn description(&self) -> &str {
        "Friction velocity from sensible heat flux and wind speed"
    }

    fn requires(&self) -> Vec<String> {
        vec![
            self.met.ta.clone(),
            self.met.ah.clone(),
            self.met.ps.clone(),
            names::FH.to_string(),
            self.wind_speed.clone(),
        ]
    }

    fn produces(&self) -> Vec<String> {
        vec![names::USTAR_FH.to_string()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let inputs = [
            self.met.ta.as_str(),
            self.met.ah.as_str(),
            self.met.ps.as_str(),
            names::FH,
            self.wind_speed.as_str(),
        ];
        let (zmd, z0) = (self.zmd, self.z0);
        let data = pointwise(ds, inputs, |[ta, ah, ps, fh, u]| {
            mf::ustar_from_heat_flux(ta, ah, ps, fh, u, zmd, z0)
        })?;
        let masked = ds.create(
            NewSeries::new(names::USTAR_FH, data)
                .with_inputs(&inputs)
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("m/s")
                .with_description("Friction velocity from surface-layer similarity"),
        )?;
        debug!(zmd, z0, masked, "surface-layer ustar");
        Ok(TransformOutcome::applied(&[names::USTAR_FH], masked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn dataset(fh: Vec<f64>, u: Vec<f64>) -> Dataset {
        let n = fh.len();
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let times = (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect();
        Dataset::from_columns(
            times,
            30,
            [
                ("Ta".to_string(), vec![25.0; n]),
                ("Ah".to_string(), vec![12.0; n]),
                ("ps".to_string(), vec![100.0; n]),
                ("Fh".to_string(), fh),
                ("u".to_string(), u),
            ],
        )
        .unwrap()
    }

    fn transform() -> UstarFromHeatFlux {
        UstarFromHeatFlux::new(MetInputs::default(), &SurfaceLayerConfig::new(18.0, 0.5)).unwrap()
    }

    #[test]
    fn test_ustar_series_from_heat_flux() {
        let mut ds = dataset(vec![0.0, 200.0, MISSING, -30.0], vec![3.0, 5.0, 3.0, 3.0]);
        let outcome = transform().apply(&mut ds).unwrap();
        assert!(outcome.is_applied());

        let ustar = ds.series("ustar_Fh").unwrap();
        assert_relative_eq!(ustar.data()[0], 0.4 * 3.0 / 36.0_f64.ln(), epsilon = 1e-10);
        assert_relative_eq!(
            ustar.data()[1],
            mf::ustar_from_heat_flux(25.0, 12.0, 100.0, 200.0, 5.0, 18.0, 0.5),
            epsilon = 1e-12
        );
        assert!(ustar.data()[1] > ustar.data()[0]);
        // Missing input keeps its own flag
        assert_eq!(ustar.flag()[2], FlagCode::Missing);
        // No solution under runaway stable stratification
        assert_eq!(ustar.flag()[3], FlagCode::DerivedMasked);
        assert!(ds.invariant_violations().is_empty());
    }

    #[test]
    fn test_requires_surface_heights() {
        let err = UstarFromHeatFlux::new(MetInputs::default(), &SurfaceLayerConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { .. }));
    }
}
