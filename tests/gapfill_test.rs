//! Integration tests for the gap-fill cascade with file-backed sources.

use std::collections::BTreeMap;
use std::io::Write;

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use fluxqc::config::{
    AlternateSource, ControlConfig, ExternalFluxConfig, GapFillConfig, L4Config, PolynomialWindow,
    VariableConfig,
};
use fluxqc::gapfill::run_gap_fill;
use fluxqc::io::{SourceCache, SourceFileError, write_dataset_file};
use fluxqc::{Dataset, FlagCode, GapFillSources, MISSING};
use tempfile::NamedTempFile;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 11, 20)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn dataset(columns: Vec<(&str, Vec<f64>)>) -> Dataset {
    let n = columns[0].1.len();
    let times = (0..n).map(|i| t0() + Duration::minutes(30 * i as i64)).collect();
    Dataset::from_columns(times, 30, columns.into_iter().map(|(k, v)| (k.to_string(), v))).unwrap()
}

fn table_file(value: f64) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# climatology").unwrap();
    for _ in 0..48 {
        let row = vec![format!("{value}"); 12];
        writeln!(file, "{}", row.join(" ")).unwrap();
    }
    file
}

fn key(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

#[test]
fn test_cascade_from_files() {
    // Ta: gaps at 1 (alternate), 3 (alternate missing → climatology)
    let mut ds = dataset(vec![("Ta", vec![20.0, MISSING, 21.0, MISSING, 22.0, 22.5])]);

    let alternate = dataset(vec![("Ta_AWS", vec![10.0, 10.5, 11.0, MISSING, 12.0, 12.5])]);
    let alt_file = NamedTempFile::new().unwrap();
    write_dataset_file(alt_file.path(), &alternate).unwrap();
    let clim_file = table_file(18.0);

    let gap_fill = GapFillConfig {
        alternate: vec![
            AlternateSource::new(key(&alt_file))
                .with_series("Ta_AWS")
                .with_transform(PolynomialWindow {
                    start: t0(),
                    end: t0() + Duration::days(1),
                    coefficients: vec![2.0, 0.0],
                }),
        ],
        climatology: Some(key(&clim_file)),
        max_interpolation_gap: None,
    };
    let config = ControlConfig::default()
        .with_variable("Ta", VariableConfig::default().with_gap_fill(gap_fill))
        .with_l4(L4Config::default().with_max_interpolation_gap(None));

    let mut cache = SourceCache::new();
    let sources = GapFillSources::new().load(&config, &mut cache).unwrap();
    assert_eq!(cache.len(), 2);

    let report = run_gap_fill(&mut ds, &config, &sources).unwrap();
    assert_eq!(report.alternate, 1);
    assert_eq!(report.climatology, 1);

    let ta = ds.series("Ta").unwrap();
    assert_relative_eq!(ta.data()[1], 21.0);
    assert_eq!(ta.flag()[1], FlagCode::AlternateSite);
    assert_relative_eq!(ta.data()[3], 18.0);
    assert_eq!(ta.flag()[3], FlagCode::Climatology);
    assert_eq!(ta.count_valid(), ta.len());

    // The loaded alternate dataset is untouched
    let shared = cache.dataset(alt_file.path()).unwrap();
    assert_eq!(shared.series("Ta_AWS").unwrap().data(), alternate.series("Ta_AWS").unwrap().data());
}

#[test]
fn test_external_precedes_alternate() {
    let mut ds = dataset(vec![("Fe", vec![MISSING, 50.0, MISSING])]);
    let external = dataset(vec![("Fe_solo", vec![80.0, 1.0, MISSING])]);
    let alternate = dataset(vec![("Fe", vec![99.0, 99.0, 99.0])]);

    let config = ControlConfig::default()
        .with_variable(
            "Fe",
            VariableConfig::default().with_gap_fill(GapFillConfig {
                alternate: vec![AlternateSource::new("alt")],
                ..Default::default()
            }),
        )
        .with_l4(L4Config::default().with_external(ExternalFluxConfig {
            source: "solo".into(),
            series: BTreeMap::from([("Fe".to_string(), "Fe_solo".to_string())]),
        }));
    let sources = GapFillSources::new()
        .with_dataset("solo", external)
        .with_dataset("alt", alternate);

    let report = run_gap_fill(&mut ds, &config, &sources).unwrap();
    assert_eq!(report.external, 1);
    assert_eq!(report.alternate, 1);

    let fe = ds.series("Fe").unwrap();
    assert_eq!(fe.flag()[0], FlagCode::ExternalGapFill);
    assert_relative_eq!(fe.data()[0], 80.0);
    assert_relative_eq!(fe.data()[1], 50.0);
    assert_eq!(fe.flag()[2], FlagCode::AlternateSite);
}

#[test]
fn test_cascade_is_reentrant() {
    let mut ds = dataset(vec![("Ta", vec![20.0, MISSING, MISSING, MISSING, 24.0])]);
    let config = ControlConfig::default()
        .with_variable("Ta", VariableConfig::default().with_gap_fill(GapFillConfig::default()))
        .with_l4(L4Config::default().with_max_interpolation_gap(Some(3)));

    let first = run_gap_fill(&mut ds, &config, &GapFillSources::new()).unwrap();
    assert_eq!(first.interpolated, 3);
    let snapshot = ds.clone();

    let second = run_gap_fill(&mut ds, &config, &GapFillSources::new()).unwrap();
    assert_eq!(second.total(), 0);
    assert_eq!(ds, snapshot);
    assert_relative_eq!(ds.series("Ta").unwrap().data()[2], 22.0, epsilon = 1e-12);
}

#[test]
fn test_unreadable_source_is_an_error() {
    let config = ControlConfig::default().with_variable(
        "Ta",
        VariableConfig::default().with_gap_fill(GapFillConfig {
            climatology: Some("/nonexistent/clim.txt".into()),
            ..Default::default()
        }),
    );
    let result = GapFillSources::new().load(&config, &mut SourceCache::new());
    assert!(matches!(result, Err(SourceFileError::Io(_))));
}
