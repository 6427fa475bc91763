use crate::io::tiles::check_lonlat;
use crate::types::{SkyError, SkyResult};
use serde::Deserialize;
use std::path::Path;

/// One transmitter record from a coverage input CSV.
///
/// The directional antenna fields are optional; transmitters without them
/// get omnidirectional pattern files.
#[derive(Debug, Clone, Deserialize)]
pub struct Transmitter {
    pub network_name: String,
    pub site_name: String,
    /// WGS84 decimal degrees
    pub latitude: f64,
    /// WGS84 decimal degrees
    pub longitude: f64,
    /// Antenna height in meters above ground
    pub antenna_height: f64,
    /// 0 = horizontal, 1 = vertical
    pub polarization: f64,
    /// Frequency in megahertz
    pub frequency: f64,
    /// Effective radiated power in watts
    pub power_eirp: f64,
    #[serde(default)]
    pub bearing: Option<f64>,
    #[serde(default)]
    pub horizontal_beamwidth: Option<f64>,
    #[serde(default)]
    pub antenna_downtilt: Option<f64>,
    #[serde(default)]
    pub vertical_beamwidth: Option<f64>,
}

impl Transmitter {
    /// File-name-safe transmitter name: network and site joined with an
    /// underscore, spaces stripped
    pub fn name(&self) -> String {
        format!(
            "{}_{}",
            self.network_name.replace(' ', ""),
            self.site_name.replace(' ', "")
        )
    }
}

/// Read and validate a transmitters CSV file.
///
/// The header must include `network_name`, `site_name`, `latitude`,
/// `longitude`, `antenna_height`, `polarization`, `frequency`, and
/// `power_eirp`. A missing column, an unparsable field, or a coordinate
/// outside the valid WGS84 range fails with the offending line number;
/// an empty file is also rejected.
pub fn read_transmitters<P: AsRef<Path>>(path: P) -> SkyResult<Vec<Transmitter>> {
    let path = path.as_ref();
    log::info!("Reading transmitters from {}", path.display());

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| SkyError::InvalidFormat(format!("{}: {}", path.display(), e)))?;

    let mut transmitters = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        // Line 1 is the header
        let line = i + 2;
        let transmitter: Transmitter = record.map_err(|e| {
            SkyError::InvalidFormat(format!(
                "transmitter data on line {} is improperly formatted: {}",
                line, e
            ))
        })?;
        check_lonlat(transmitter.longitude, transmitter.latitude).map_err(|e| {
            SkyError::InvalidFormat(format!("transmitter on line {}: {}", line, e))
        })?;
        transmitters.push(transmitter);
    }

    if transmitters.is_empty() {
        return Err(SkyError::InvalidFormat(format!(
            "{} contains no transmitter records",
            path.display()
        )));
    }

    log::debug!("Read {} transmitters", transmitters.len());
    Ok(transmitters)
}

/// Longitude-latitude pairs of the given transmitters
pub fn transmitter_lonlats(transmitters: &[Transmitter]) -> Vec<(f64, f64)> {
    transmitters
        .iter()
        .map(|t| (t.longitude, t.latitude))
        .collect()
}
