//! Deterministic names derived from the input granule name and the CRID.
//!
//! Granule names are underscore-delimited:
//! `SISTER_<INSTRUMENT>_<LEVEL>_<PRODUCT>_<YYYYMMDDTHHMMSS>_<CRID>`.
//! Every function here is pure; the same inputs always give the same names.
use crate::error::{Error, Result};
use crate::types::{Instrument, SensorTag};

pub const RADIANCE_PRODUCT_TOKEN: &str = "L1B_RDN";
pub const REFLECTANCE_PRODUCT_TOKEN: &str = "L2A_RFL";

const INSTRUMENT_POS: usize = 1;
const DATETIME_POS: usize = 4;

fn token<'a>(basename: &'a str, pos: usize) -> Result<&'a str> {
    basename
        .split('_')
        .nth(pos)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::malformed(basename, format!("missing token at position {}", pos)))
}

/// Acquisition datetime token (`YYYYMMDDTHHMMSS`).
pub fn datetime_token(basename: &str) -> Result<&str> {
    let t = token(basename, DATETIME_POS)?;
    if t.len() < 8 || !t.is_char_boundary(8) || !t[..8].bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed(
            basename,
            format!("datetime token {:?} does not start with YYYYMMDD", t),
        ));
    }
    Ok(t)
}

/// `SISTER_AVNG_L1B_RDN_20200101T120000_000` + `001` -> `SISTER_AVNG_L2A_RFL_20200101T120000_001`
pub fn derive_product_basename(radiance_basename: &str, crid: &str) -> Result<String> {
    if !radiance_basename.contains(RADIANCE_PRODUCT_TOKEN) {
        return Err(Error::malformed(
            radiance_basename,
            format!("expected product token {}", RADIANCE_PRODUCT_TOKEN),
        ));
    }
    let replaced = radiance_basename.replace(RADIANCE_PRODUCT_TOKEN, REFLECTANCE_PRODUCT_TOKEN);
    let mut tokens: Vec<&str> = replaced.split('_').collect();
    tokens.pop();
    tokens.push(crid);
    Ok(tokens.join("_"))
}

pub fn derive_instrument(basename: &str) -> Result<Instrument> {
    Ok(Instrument::from_token(token(basename, INSTRUMENT_POS)?))
}

/// Engine sensor tag for a radiance granule. Unknown instruments map to
/// `NA-<YYYYMMDD>`.
pub fn derive_sensor_tag(radiance_basename: &str) -> Result<SensorTag> {
    let datetime = datetime_token(radiance_basename)?;
    let tag = match derive_instrument(radiance_basename)? {
        Instrument::Emit => SensorTag::Emit,
        Instrument::AvirisNg => SensorTag::AvirisNg,
        Instrument::AvirisClassic => SensorTag::AvirisClassic,
        Instrument::Desis | Instrument::Other => SensorTag::Generic {
            date: datetime[..8].to_string(),
        },
    };
    Ok(tag)
}

/// Basename the engine expects for the staged radiance file; it infers
/// sensor-specific behaviour from this name.
pub fn derive_engine_basename(radiance_basename: &str, sensor: &SensorTag) -> Result<String> {
    let datetime = datetime_token(radiance_basename)?;
    let name = match sensor {
        SensorTag::Emit | SensorTag::AvirisNg => format!("{}{}", sensor, datetime),
        SensorTag::AvirisClassic => format!("f{}t00p00r00", &datetime[2..8]),
        SensorTag::Generic { .. } => radiance_basename.to_string(),
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVNG: &str = "SISTER_AVNG_L1B_RDN_20200101T120000_001";

    #[test]
    fn product_basename_swaps_token_and_crid() {
        assert_eq!(
            derive_product_basename(AVNG, "001").unwrap(),
            "SISTER_AVNG_L2A_RFL_20200101T120000_001"
        );
        assert_eq!(
            derive_product_basename("SISTER_EMIT_L1B_RDN_20220814T150000_000", "2").unwrap(),
            "SISTER_EMIT_L2A_RFL_20220814T150000_2"
        );
    }

    #[test]
    fn product_basename_is_idempotent() {
        let a = derive_product_basename(AVNG, "007").unwrap();
        let b = derive_product_basename(AVNG, "007").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn product_basename_requires_radiance_token() {
        assert!(matches!(
            derive_product_basename("SISTER_AVNG_L2A_RFL_20200101T120000_001", "001"),
            Err(Error::MalformedGranule { .. })
        ));
    }

    #[test]
    fn sensor_tags_follow_instrument_table() {
        assert_eq!(derive_sensor_tag(AVNG).unwrap(), SensorTag::AvirisNg);
        assert_eq!(
            derive_sensor_tag("SISTER_EMIT_L1B_RDN_20220814T150000_000").unwrap(),
            SensorTag::Emit
        );
        assert_eq!(
            derive_sensor_tag("SISTER_AVCL_L1B_RDN_20110513T175417_000").unwrap(),
            SensorTag::AvirisClassic
        );
        assert_eq!(
            derive_sensor_tag("SISTER_PRISMA_L1B_RDN_20210601T101010_000").unwrap(),
            SensorTag::Generic {
                date: "20210601".into()
            }
        );
    }

    #[test]
    fn malformed_datetime_is_rejected() {
        assert!(derive_sensor_tag("SISTER_AVNG_L1B_RDN").is_err());
        assert!(derive_sensor_tag("SISTER_AVNG_L1B_RDN_2020_001").is_err());
    }

    #[test]
    fn engine_basenames_per_sensor() {
        let tag = derive_sensor_tag(AVNG).unwrap();
        assert_eq!(derive_engine_basename(AVNG, &tag).unwrap(), "ang20200101T120000");

        let avcl = "SISTER_AVCL_L1B_RDN_20110513T175417_000";
        let tag = derive_sensor_tag(avcl).unwrap();
        assert_eq!(derive_engine_basename(avcl, &tag).unwrap(), "f110513t00p00r00");

        let other = "SISTER_DESIS_L1B_RDN_20210601T101010_000";
        let tag = derive_sensor_tag(other).unwrap();
        assert_eq!(derive_engine_basename(other, &tag).unwrap(), other);
    }
}
