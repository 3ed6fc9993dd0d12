//! Level-by-level pipeline runner.
//!
//! Provides a high-level interface for taking an L1 dataset through QC,
//! corrections and gap filling to L4.

use tracing::{debug, info};

use crate::aggregate::DailySummary;
use crate::config::{ConfigError, ControlConfig};
use crate::corrections::apply_linear_corrections;
use crate::gapfill::{GapFillReport, GapFillSources, run_gap_fill};
use crate::qc::{QcReport, run_qc_checks};
use crate::series::Dataset;
use crate::types::ProcessingLevel;

use super::chain::{Pipeline, TransformRecord};
use super::error::PipelineError;

// =============================================================================
// Run Reports
// =============================================================================

/// Counts and outcomes gathered over a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// L2 QC pass.
    pub l2_qc: QcReport,
    /// Samples changed by linear corrections.
    pub linear_corrected: usize,
    /// L3 transform outcomes, in run order.
    pub l3: Vec<TransformRecord>,
    /// L4 gap filling.
    pub gap_fill: GapFillReport,
    /// QC re-run after gap filling, if configured.
    pub l4_qc: Option<QcReport>,
}

/// Every level produced by [`FluxPipeline::run`].
///
/// Each dataset is an independent snapshot; later levels never modify
/// earlier ones.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub l1: Dataset,
    pub l2: Dataset,
    pub l3: Dataset,
    pub l4: Dataset,
    pub daily: Option<DailySummary>,
    pub report: RunReport,
}

// =============================================================================
// Flux Pipeline
// =============================================================================

/// L1 → L4 processing for one site.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use fluxqc::config::ControlConfig;
/// use fluxqc::gapfill::GapFillSources;
/// use fluxqc::io::{SourceCache, read_dataset_file};
/// use fluxqc::pipeline::FluxPipeline;
///
/// let config = ControlConfig::default().with_site("Howard Springs");
/// let l1 = read_dataset_file(Path::new("HowardSprings_L1.txt")).unwrap();
/// let sources = GapFillSources::new().load(&config, &mut SourceCache::new()).unwrap();
///
/// let run = FluxPipeline::new(config).unwrap().run(l1, &sources).unwrap();
/// println!("{} samples gap filled", run.report.gap_fill.total());
/// ```
#[derive(Clone, Debug)]
pub struct FluxPipeline {
    config: ControlConfig,
}

impl FluxPipeline {
    /// Create a runner, rejecting malformed parameters up front.
    pub fn new(config: ControlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get a reference to the control parameters.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// L1 → L2: QC checks, then linear corrections of the surviving samples.
    pub fn run_l2(&self, l1: &Dataset) -> Result<(Dataset, QcReport, usize), PipelineError> {
        let mut l2 = l1.to_level(ProcessingLevel::L2);
        if !self.config.site.is_empty() && l2.attributes().site.is_empty() {
            l2 = l2.with_site(&self.config.site);
        }

        let qc = run_qc_checks(&mut l2, &self.config)?;
        l2.record_function("QcChecks");

        let mut corrected = 0;
        for (name, variable) in &self.config.variables {
            if variable.linear.is_empty() {
                continue;
            }
            if !l2.contains(name) {
                debug!(series = %name, "not present, linear correction skipped");
                continue;
            }
            corrected += apply_linear_corrections(&mut l2, name, &variable.linear)?;
        }
        if corrected > 0 {
            l2.record_function("LinearCorrections");
        }
        Ok((l2, qc, corrected))
    }

    /// L2 → L3: validate and run the configured transform chain.
    pub fn run_l3(&self, l2: &Dataset) -> Result<(Dataset, Vec<TransformRecord>), PipelineError> {
        let mut l3 = l2.to_level(ProcessingLevel::L3);
        let pipeline = Pipeline::from_config(&self.config);
        pipeline.validate(&l3)?;
        let records = pipeline.run(&mut l3)?;
        Ok((l3, records))
    }

    /// L3 → L4: gap-fill cascade, then optionally a final QC pass.
    pub fn run_l4(
        &self,
        l3: &Dataset,
        sources: &GapFillSources,
    ) -> Result<(Dataset, GapFillReport, Option<QcReport>), PipelineError> {
        let mut l4 = l3.to_level(ProcessingLevel::L4);
        let filled = run_gap_fill(&mut l4, &self.config, sources)?;
        l4.record_function("GapFill");

        let qc = if self.config.l4.rerun_qc {
            let report = run_qc_checks(&mut l4, &self.config)?;
            l4.record_function("QcChecks");
            Some(report)
        } else {
            None
        };
        Ok((l4, filled, qc))
    }

    /// Run every level.
    ///
    /// # Errors
    /// The first run-aborting error. Nothing is returned for a failed run;
    /// call the per-level methods to keep earlier levels.
    pub fn run(&self, l1: Dataset, sources: &GapFillSources) -> Result<PipelineRun, PipelineError> {
        info!(site = %self.config.site, records = l1.len(), "pipeline started");

        let (l2, l2_qc, linear_corrected) = self.run_l2(&l1)?;
        let (l3, l3_records) = self.run_l3(&l2)?;
        let (l4, gap_fill, l4_qc) = self.run_l4(&l3, sources)?;
        let daily = self
            .config
            .l4
            .daily
            .as_ref()
            .map(|daily| DailySummary::from_dataset(&l4, daily));

        info!(
            site = %self.config.site,
            rejected = l2_qc.total(),
            filled = gap_fill.total(),
            "pipeline complete"
        );

        Ok(PipelineRun {
            l1,
            l2,
            l3,
            l4,
            daily,
            report: RunReport {
                l2_qc,
                linear_corrected,
                l3: l3_records,
                gap_fill,
                l4_qc,
            },
        })
    }
}
