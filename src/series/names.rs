//! Canonical series names used by the built-in transforms.
//!
//! Raw sonic and gas-analyser names follow the common flux-tower logger
//! conventions; derived names are produced by the L3 transforms.

// Sonic anemometer means
pub const UX: &str = "Ux";
pub const UY: &str = "Uy";
pub const UZ: &str = "Uz";
pub const TV: &str = "Tv_CSAT";
pub const WD: &str = "Wd_CSAT";

// Raw covariances with the wind components
pub const UXT: &str = "UxT";
pub const UYT: &str = "UyT";
pub const UZT: &str = "UzT";
pub const UXA: &str = "UxA";
pub const UYA: &str = "UyA";
pub const UZA: &str = "UzA";
pub const UXC: &str = "UxC";
pub const UYC: &str = "UyC";
pub const UZC: &str = "UzC";
pub const UXUZ: &str = "UxUz";
pub const UYUZ: &str = "UyUz";
pub const UXUY: &str = "UxUy";
pub const UXUX: &str = "UxUx";
pub const UYUY: &str = "UyUy";

// Meteorology
pub const TA: &str = "Ta";
pub const AH: &str = "Ah";
pub const PS: &str = "ps";
pub const CC: &str = "Cc";
pub const TA_HMP: &str = "Ta_HMP";
pub const AH_HMP: &str = "Ah_HMP";

// Rotation outputs
pub const ETA: &str = "eta";
pub const THETA: &str = "theta";
pub const U: &str = "u";
pub const V: &str = "v";
pub const W: &str = "w";
pub const WT: &str = "wT";
pub const WA: &str = "wA";
pub const WC: &str = "wC";
pub const UW: &str = "uw";
pub const VW: &str = "vw";

// Spectral correction outputs
pub const WT_M: &str = "wTM";
pub const WA_M: &str = "wAM";
pub const WC_M: &str = "wCM";
pub const UW_M: &str = "uwM";
pub const VW_M: &str = "vwM";
pub const USTAR_M: &str = "ustarM";
pub const L_M: &str = "LM";

// Derived meteorology
pub const E: &str = "e";
pub const ESAT: &str = "esat";
pub const VPD: &str = "VPD";
pub const RHOD: &str = "rhod";
pub const RHOM: &str = "rhom";
pub const LV: &str = "Lv";
pub const CPM: &str = "Cpm";
pub const Q: &str = "q";
pub const MR: &str = "mr";
pub const TA_SONIC: &str = "Ta_CSAT";

// Fluxes
pub const FHV: &str = "Fhv";
pub const FH: &str = "Fh";
pub const FE_RAW: &str = "Fe_raw";
pub const FC_RAW: &str = "Fc_raw";
pub const FE: &str = "Fe";
pub const FC: &str = "Fc";
pub const FM: &str = "Fm";
pub const USTAR: &str = "ustar";
pub const WA_WPL: &str = "wA_wpl";
pub const NEE: &str = "NEE";
pub const NEP: &str = "NEP";
pub const USTAR_FH: &str = "ustar_Fh";

// Radiation and energy balance
pub const FSD: &str = "Fsd";
pub const FSU: &str = "Fsu";
pub const FLD: &str = "Fld";
pub const FLU: &str = "Flu";
pub const FN: &str = "Fn";
pub const FG: &str = "Fg";
pub const FA: &str = "Fa";
pub const TS: &str = "Ts";
pub const SWS: &str = "Sws";
pub const FG_STORAGE: &str = "Fg_storage";
pub const CS: &str = "Cs";
pub const FC_STORAGE: &str = "Fc_storage";

// Instrument diagnostics
pub const DIAG_CSAT: &str = "Diag_CSAT";
pub const DIAG_IRGA: &str = "Diag_7500";
pub const AGC_IRGA: &str = "AGC_7500";
pub const AH_IRGA: &str = "Ah_7500_Av";
pub const CC_IRGA: &str = "Cc_7500_Av";
pub const AH_IRGA_SD: &str = "Ah_7500_Sd";
pub const CC_IRGA_SD: &str = "Cc_7500_Sd";

// Ratio gap filling
pub const EF: &str = "EF";
pub const BR: &str = "BR";
pub const WUE: &str = "WUE";
pub const FE_GF: &str = "Fe_gf";
