//! Shared types and enums used across rflpack.
//! Includes `Instrument`, `SensorTag`, `ProductKind`, `BrowseFormat` and
//! `LineInterpolation`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Instrument family, keyed by the second token of a granule name
/// (`SISTER_<INSTRUMENT>_L1B_RDN_<datetime>_<crid>`).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Instrument {
    Emit,
    AvirisNg,
    AvirisClassic,
    Desis,
    Other,
}

impl Instrument {
    pub fn from_token(token: &str) -> Self {
        match token {
            "EMIT" => Instrument::Emit,
            "AVNG" => Instrument::AvirisNg,
            "AVCL" => Instrument::AvirisClassic,
            "DESIS" => Instrument::Desis,
            _ => Instrument::Other,
        }
    }

    /// Nominal (red, green, blue) wavelengths in nm used for the browse composite.
    pub fn quicklook_wavelengths(&self) -> [f64; 3] {
        match self {
            Instrument::Desis => [660.0, 850.0, 560.0],
            _ => [1660.0, 850.0, 560.0],
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instrument::Emit => write!(f, "EMIT"),
            Instrument::AvirisNg => write!(f, "AVNG"),
            Instrument::AvirisClassic => write!(f, "AVCL"),
            Instrument::Desis => write!(f, "DESIS"),
            Instrument::Other => write!(f, "Other"),
        }
    }
}

/// Sensor identifier handed to the correction engine.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SensorTag {
    Emit,
    AvirisNg,
    AvirisClassic,
    /// Sensors the engine has no preset for; carries the acquisition date (`YYYYMMDD`).
    Generic { date: String },
}

impl SensorTag {
    /// Whether the engine should run with the neural-network radiative-transfer emulator.
    pub fn uses_emulator(&self) -> bool {
        !matches!(self, SensorTag::AvirisClassic)
    }

    /// Whether the engine takes a channelized radiometric uncertainty table.
    pub fn uses_channelized_uncertainty(&self) -> bool {
        matches!(self, SensorTag::Emit)
    }
}

impl std::fmt::Display for SensorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorTag::Emit => write!(f, "emit"),
            SensorTag::AvirisNg => write!(f, "ang"),
            SensorTag::AvirisClassic => write!(f, "avcl"),
            SensorTag::Generic { date } => write!(f, "NA-{}", date),
        }
    }
}

/// Final deliverables produced from one correction run.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ProductKind {
    Reflectance,
    Uncertainty,
    AtmosphericState,
}

impl ProductKind {
    /// Suffix appended to the product basename for the final files.
    pub fn suffix(&self) -> &'static str {
        match self {
            ProductKind::Reflectance => "",
            ProductKind::Uncertainty => "_UNC",
            ProductKind::AtmosphericState => "_ATM",
        }
    }

    /// Product token written to metadata sidecars and catalog properties.
    pub fn product_token(&self) -> &'static str {
        match self {
            ProductKind::Reflectance => "RFL",
            ProductKind::Uncertainty => "RFL_UNC",
            ProductKind::AtmosphericState => "RFL_ATM",
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKind::Reflectance => write!(f, "Reflectance"),
            ProductKind::Uncertainty => write!(f, "Uncertainty"),
            ProductKind::AtmosphericState => write!(f, "AtmosphericState"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum, Serialize, Deserialize)]
pub enum BrowseFormat {
    #[default]
    Png,
    Jpeg, // Lossy
}

impl BrowseFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            BrowseFormat::Png => "png",
            BrowseFormat::Jpeg => "jpg",
        }
    }
}

/// Strategy the engine uses to extend the per-pixel solution across the scene.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineInterpolation {
    #[default]
    Empirical,
    Analytical,
}
