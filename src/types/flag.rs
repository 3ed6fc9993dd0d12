//! Per-sample quality flag codes.
//!
//! Every sample of every series carries one [`FlagCode`]. The numeric code
//! follows the convention used by flux-tower processing chains: the ones
//! digit is zero exactly when the value is good, and the tens/hundreds
//! digits name the reason. A good value may therefore still carry a
//! provenance marker (e.g. `Interpolated = 60`), while any non-zero ones
//! digit means the data slot holds the missing sentinel.
//!
//! # Example
//!
//! ```
//! use fluxqc::types::FlagCode;
//!
//! assert!(FlagCode::Good.is_good());
//! assert!(FlagCode::Interpolated.is_good());
//! assert!(!FlagCode::RangeL2.is_good());
//! assert_eq!(FlagCode::from_code(14), Some(FlagCode::DensityMasked));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Quality flag reason code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum FlagCode {
    /// Original good value.
    #[default]
    Good = 0,
    /// Missing at ingest, or invalid with no more specific reason.
    Missing = 1,
    /// Outside the monthly range bounds at L2.
    RangeL2 = 2,
    /// Sonic anemometer diagnostic failure.
    SonicDiagnostic = 3,
    /// Gas analyser diagnostic failure.
    IrgaDiagnostic = 4,
    /// Diurnal outlier at L2.
    DiurnalL2 = 5,
    /// Inside an excluded date window.
    ExcludedDate = 6,
    /// Inside an excluded time-of-day window.
    ExcludedHour = 7,
    /// Linear or drift correction applied.
    LinearCorrected = 10,
    /// Coordinate rotation produced an invalid value.
    RotationMasked = 11,
    /// Massman spectral correction produced an invalid value.
    SpectralMasked = 12,
    /// Virtual to actual heat flux conversion produced an invalid value.
    VirtualHeatMasked = 13,
    /// WPL density correction produced an invalid value.
    DensityMasked = 14,
    /// Air temperature from sonic virtual temperature was invalid.
    TaFromTvMasked = 15,
    /// Outside the monthly range bounds at L3.
    RangeL3 = 16,
    /// Diurnal outlier at L3.
    DiurnalL3 = 17,
    /// Rejected by the friction velocity threshold.
    UstarFiltered = 18,
    /// Rejected because a companion flux was missing.
    FluxGapCoordinated = 19,
    /// Storage correction applied.
    StorageCorrected = 20,
    /// Storage correction produced an invalid value.
    StorageMasked = 21,
    /// Meteorological variable or flux assembly produced an invalid value.
    DerivedMasked = 22,
    /// Taken from a lower-precedence source of a merge.
    MergedSecondary = 30,
    /// Filled from a climatology table.
    Climatology = 40,
    /// Filled from a ratio surface.
    Ratio = 50,
    /// Filled by linear interpolation.
    Interpolated = 60,
    /// Outside the monthly range bounds at L4.
    RangeL4 = 82,
    /// Diurnal outlier at L4.
    DiurnalL4 = 83,
    /// Filled from an externally gap-filled flux set.
    ExternalGapFill = 90,
    /// Filled from an alternate site.
    AlternateSite = 100,
}

impl FlagCode {
    /// All reason codes, in ascending numeric order.
    pub const ALL: [FlagCode; 29] = [
        FlagCode::Good,
        FlagCode::Missing,
        FlagCode::RangeL2,
        FlagCode::SonicDiagnostic,
        FlagCode::IrgaDiagnostic,
        FlagCode::DiurnalL2,
        FlagCode::ExcludedDate,
        FlagCode::ExcludedHour,
        FlagCode::LinearCorrected,
        FlagCode::RotationMasked,
        FlagCode::SpectralMasked,
        FlagCode::VirtualHeatMasked,
        FlagCode::DensityMasked,
        FlagCode::TaFromTvMasked,
        FlagCode::RangeL3,
        FlagCode::DiurnalL3,
        FlagCode::UstarFiltered,
        FlagCode::FluxGapCoordinated,
        FlagCode::StorageCorrected,
        FlagCode::StorageMasked,
        FlagCode::DerivedMasked,
        FlagCode::MergedSecondary,
        FlagCode::Climatology,
        FlagCode::Ratio,
        FlagCode::Interpolated,
        FlagCode::RangeL4,
        FlagCode::DiurnalL4,
        FlagCode::ExternalGapFill,
        FlagCode::AlternateSite,
    ];

    /// Numeric code.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a reason code by its numeric value.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.code() == code)
    }

    /// A value is good when the ones digit of its code is zero.
    #[inline]
    pub fn is_good(self) -> bool {
        self.code() % 10 == 0
    }

    /// Negation of [`is_good`](Self::is_good).
    #[inline]
    pub fn is_bad(self) -> bool {
        !self.is_good()
    }

    /// Combine an accumulated flag with the flag of a further input.
    ///
    /// The first rejection wins: `other` only replaces `self` when `self` is
    /// still good and `other` is not. Good provenance markers on the first
    /// input survive as long as every input is good.
    #[inline]
    pub fn merge(self, other: FlagCode) -> FlagCode {
        if self.is_good() && other.is_bad() {
            other
        } else {
            self
        }
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            FlagCode::Good => "good",
            FlagCode::Missing => "missing",
            FlagCode::RangeL2 => "range check (L2)",
            FlagCode::SonicDiagnostic => "sonic diagnostic",
            FlagCode::IrgaDiagnostic => "gas analyser diagnostic",
            FlagCode::DiurnalL2 => "diurnal check (L2)",
            FlagCode::ExcludedDate => "excluded date",
            FlagCode::ExcludedHour => "excluded hour",
            FlagCode::LinearCorrected => "linear correction",
            FlagCode::RotationMasked => "rotation masked",
            FlagCode::SpectralMasked => "spectral correction masked",
            FlagCode::VirtualHeatMasked => "virtual heat flux conversion masked",
            FlagCode::DensityMasked => "density correction masked",
            FlagCode::TaFromTvMasked => "Ta from Tv masked",
            FlagCode::RangeL3 => "range check (L3)",
            FlagCode::DiurnalL3 => "diurnal check (L3)",
            FlagCode::UstarFiltered => "ustar filter",
            FlagCode::FluxGapCoordinated => "flux gap coordination",
            FlagCode::StorageCorrected => "storage correction",
            FlagCode::StorageMasked => "storage correction masked",
            FlagCode::DerivedMasked => "derived variable masked",
            FlagCode::MergedSecondary => "merged from secondary source",
            FlagCode::Climatology => "gap filled from climatology",
            FlagCode::Ratio => "gap filled from ratios",
            FlagCode::Interpolated => "gap filled by interpolation",
            FlagCode::RangeL4 => "range check (L4)",
            FlagCode::DiurnalL4 => "diurnal check (L4)",
            FlagCode::ExternalGapFill => "gap filled from external flux set",
            FlagCode::AlternateSite => "gap filled from alternate site",
        }
    }
}

impl fmt::Display for FlagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

impl From<FlagCode> for u16 {
    #[inline]
    fn from(flag: FlagCode) -> u16 {
        flag.code()
    }
}
