//! Integration tests for the L1 → L4 pipeline.
//!
//! Runs a synthetic three-day tower record through every level and checks
//! flag propagation, rotation, gap-fill precedence and daily aggregation.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use fluxqc::config::{
    ControlConfig, DailyConfig, GapFillConfig, L3Config, L4Config, MassmanConfig, RangeCheck,
    RatioConfig, SoilConfig, VariableConfig,
};
use fluxqc::qc::run_qc_checks;
use fluxqc::{
    Dataset, FlagCode, FluxPipeline, GapFillSources, MISSING, MonthlyTable, PipelineError,
    ProcessingLevel, TransformKind, TransformOutcome,
};

const TOL: f64 = 1e-9;
const DAYS: usize = 3;
const SPIKE: usize = 30;
const DIAG_FAIL: usize = 48 + 24;

/// Daytime shape, zero at night.
fn sun(i: usize) -> f64 {
    let hour = (i % 48) as f64 / 2.0;
    (PI * (hour - 6.0) / 12.0).sin().max(0.0)
}

fn column(n: usize, f: impl Fn(usize) -> f64) -> Vec<f64> {
    (0..n).map(f).collect()
}

/// Three days of half-hourly raw tower data.
fn site_l1() -> Dataset {
    let n = 48 * DAYS;
    let t0 = NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let times = (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect();

    let columns: Vec<(&str, Vec<f64>)> = vec![
        ("Ux", column(n, |i| 3.0 + sun(i))),
        ("Uy", vec![1.0; n]),
        ("Uz", vec![0.1; n]),
        ("UxUz", vec![-0.2; n]),
        ("UyUz", vec![-0.05; n]),
        ("UxUy", vec![0.1; n]),
        ("UxUx", vec![1.2; n]),
        ("UyUy", vec![0.9; n]),
        ("UxT", vec![-0.01; n]),
        ("UyT", vec![0.005; n]),
        ("UzT", column(n, |i| 0.02 + 0.2 * sun(i))),
        ("UxA", vec![0.002; n]),
        ("UyA", vec![0.001; n]),
        ("UzA", column(n, |i| 0.01 + 0.08 * sun(i))),
        ("UxC", vec![0.01; n]),
        ("UyC", vec![0.0; n]),
        ("UzC", column(n, |i| -0.05 - 0.5 * sun(i))),
        ("Ta", column(n, |i| 24.0 + 6.0 * sun(i))),
        ("Tv_CSAT", column(n, |i| 25.5 + 6.0 * sun(i))),
        ("Ah", vec![15.0; n]),
        ("ps", vec![100.5; n]),
        ("Cc", vec![680.0; n]),
        ("Fsd", column(n, |i| if i == SPIKE { 5000.0 } else { 800.0 * sun(i) })),
        ("Fsu", column(n, |i| 120.0 * sun(i))),
        ("Fld", vec![380.0; n]),
        ("Flu", column(n, |i| 420.0 + 30.0 * sun(i))),
        ("Fg", column(n, |i| 5.0 + 60.0 * sun(i))),
        ("Ts", column(n, |i| 25.0 + 5.0 * sun(i))),
        ("Diag_CSAT", column(n, |i| if i == DIAG_FAIL { 8.0 } else { 0.0 })),
        ("Diag_7500", vec![0.0; n]),
    ];
    Dataset::from_columns(times, 30, columns.into_iter().map(|(k, v)| (k.to_string(), v)))
        .unwrap()
        .with_site("Synthetic")
}

fn config() -> ControlConfig {
    let filled = || VariableConfig::default().with_gap_fill(GapFillConfig::default());
    ControlConfig::default()
        .with_site("Synthetic")
        .with_variable("Fsd", VariableConfig::default().with_range(RangeCheck::new(-10.0, 1500.0)))
        .with_variable("Fh", filled().with_range(RangeCheck::new(-200.0, 800.0)))
        .with_variable("Fe", filled())
        .with_variable("Fc", filled())
        .with_soil(SoilConfig::new(0.08, 1300.0, 0.01, 0.15))
        .with_l4(
            L4Config::default()
                .with_ratios(RatioConfig {
                    evaporative_fraction: "ef".into(),
                    bowen_ratio: None,
                    water_use_efficiency: None,
                })
                .with_daily(DailyConfig::budget(30)),
        )
}

fn sources() -> GapFillSources {
    GapFillSources::new().with_table("ef", MonthlyTable::constant(48, 0.4).unwrap())
}

#[test]
fn test_full_run_levels() {
    let l1 = site_l1();
    let run = FluxPipeline::new(config()).unwrap().run(l1.clone(), &sources()).unwrap();

    assert_eq!(run.l1, l1);
    assert_eq!(run.l2.level(), ProcessingLevel::L2);
    assert_eq!(run.l3.level(), ProcessingLevel::L3);
    assert_eq!(run.l4.level(), ProcessingLevel::L4);

    for ds in [&run.l1, &run.l2, &run.l3, &run.l4] {
        assert!(ds.invariant_violations().is_empty());
    }
    for name in ["u", "wT", "Fh", "Fe", "Fc", "Fn", "Fa", "ustar", "Fg_storage"] {
        assert!(run.l3.contains(name), "{name} missing at L3");
    }

    let functions = &run.l3.attributes().functions;
    assert!(functions.contains(&"CoordinateRotation".to_string()));
    assert!(functions.contains(&"DensityCorrection".to_string()));
    assert!(run.report.l3.iter().all(|r| r.outcome.is_applied()), "{:?}", run.report.l3);
}

#[test]
fn test_rotation_zeroes_cross_and_vertical_wind() {
    let run = FluxPipeline::new(config()).unwrap().run(site_l1(), &sources()).unwrap();
    let v = run.l3.series("v").unwrap();
    let w = run.l3.series("w").unwrap();
    let u = run.l3.series("u").unwrap();
    for i in (0..run.l3.len()).filter(|&i| i != DIAG_FAIL) {
        assert_relative_eq!(v.data()[i], 0.0, epsilon = TOL);
        assert_relative_eq!(w.data()[i], 0.0, epsilon = TOL);
        let ux = 3.0 + sun(i);
        assert_relative_eq!(u.data()[i], (ux * ux + 1.0 + 0.01_f64).sqrt(), epsilon = 1e-9);
    }
}

#[test]
fn test_rejections_propagate_and_fill() {
    let run = FluxPipeline::new(config()).unwrap().run(site_l1(), &sources()).unwrap();

    // Range rejection at L2 reaches net radiation and available energy
    assert_eq!(run.l2.series("Fsd").unwrap().flag()[SPIKE], FlagCode::RangeL2);
    assert_eq!(run.l2.series("Fsd").unwrap().data()[SPIKE], MISSING);
    assert!(run.l3.series("Fn").unwrap().flag()[SPIKE].is_bad());
    assert!(run.l3.series("Fa").unwrap().flag()[SPIKE].is_bad());

    // Sonic diagnostic failure removes every flux at that sample
    assert_eq!(run.l2.series("Ux").unwrap().flag()[DIAG_FAIL], FlagCode::SonicDiagnostic);
    for flux in ["Fh", "Fe", "Fc"] {
        assert!(run.l3.series(flux).unwrap().flag()[DIAG_FAIL].is_bad(), "{flux}");
    }

    // Latent heat comes back from the evaporative fraction, not interpolation
    let fe = run.l4.series("Fe").unwrap();
    let fa = run.l3.series("Fa").unwrap().data()[DIAG_FAIL];
    assert_eq!(fe.flag()[DIAG_FAIL], FlagCode::Ratio);
    assert_relative_eq!(fe.data()[DIAG_FAIL], 0.4 * fa, epsilon = TOL);

    // Sensible heat and CO2 have no ratio surface and are interpolated
    let fh = run.l4.series("Fh").unwrap();
    assert_eq!(fh.flag()[DIAG_FAIL], FlagCode::Interpolated);
    let (before, after) = (fh.data()[DIAG_FAIL - 1], fh.data()[DIAG_FAIL + 1]);
    assert_relative_eq!(fh.data()[DIAG_FAIL], 0.5 * (before + after), epsilon = TOL);
    assert_eq!(run.l4.series("Fc").unwrap().flag()[DIAG_FAIL], FlagCode::Interpolated);

    assert!(run.report.gap_fill.ratio.fe >= 1);
    assert!(run.report.gap_fill.interpolated >= 2);
}

#[test]
fn test_qc_rerun_is_noop() {
    let config = config();
    let run = FluxPipeline::new(config.clone()).unwrap().run(site_l1(), &sources()).unwrap();

    let mut again = run.l2.clone();
    let report = run_qc_checks(&mut again, &config).unwrap();
    assert_eq!(report.total(), 0);
    assert_eq!(again, run.l2);
}

#[test]
fn test_daily_budget() {
    let run = FluxPipeline::new(config()).unwrap().run(site_l1(), &sources()).unwrap();
    let daily = run.daily.unwrap();
    assert_eq!(daily.len(), DAYS);

    // Every Fe sample is valid after gap filling
    let fe_sum = daily.get("Fe_sum").unwrap();
    assert!(fe_sum.iter().all(|&v| v != MISSING));
    assert_eq!(daily.counts["Fe_sum"], vec![48; DAYS]);
    // Net radiation on the spike day still has its rejected sample
    assert_eq!(daily.get("Fn_sum").unwrap()[0], MISSING);
}

#[test]
fn test_spectral_chain_uses_corrected_covariances() {
    let config = config()
        .with_massman(MassmanConfig::new(20.0, 0.0, 0.5, 0.2))
        .with_l3(L3Config::with_transforms(vec![
            TransformKind::MeteorologicalVariables,
            TransformKind::CoordinateRotation,
            TransformKind::SpectralCorrection,
            TransformKind::CalculateFluxes,
            TransformKind::VirtualHeatFlux,
            TransformKind::DensityCorrection,
        ]));
    let run = FluxPipeline::new(config).unwrap().run(site_l1(), &sources()).unwrap();

    assert!(run.l3.contains("LM"));
    let inputs = &run.l3.series("Fhv").unwrap().attributes.inputs;
    assert!(inputs.contains(&"wTM".to_string()));

    // Correction only ever restores attenuated covariance
    let (wt, wtm) = (run.l3.series("wT").unwrap(), run.l3.series("wTM").unwrap());
    for i in (0..run.l3.len()).filter(|&i| wtm.is_valid(i)) {
        assert!(wtm.data()[i] >= wt.data()[i] - TOL);
    }
}

#[test]
fn test_misordered_chain_aborts_l3() {
    let config = config().with_l3(L3Config::with_transforms(vec![
        TransformKind::CalculateFluxes,
        TransformKind::CoordinateRotation,
    ]));
    let pipeline = FluxPipeline::new(config).unwrap();
    let (l2, _, _) = pipeline.run_l2(&site_l1()).unwrap();
    let err = pipeline.run_l3(&l2).unwrap_err();
    assert!(matches!(err, PipelineError::OrderViolation { .. }));
}

#[test]
fn test_missing_parameters_skip_transform() {
    let config = config().with_l3(L3Config::with_transforms(vec![
        TransformKind::NetRadiation,
        TransformKind::UstarFilter,
        TransformKind::Co2Storage,
    ]));
    let pipeline = FluxPipeline::new(config).unwrap();
    let (l2, _, _) = pipeline.run_l2(&site_l1()).unwrap();
    let (_, records) = pipeline.run_l3(&l2).unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["NetRadiation"]);
    assert!(matches!(records[0].outcome, TransformOutcome::Applied { .. }));
}
