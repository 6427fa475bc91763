//! Generation of the propagation modeler's per-transmitter input files.
//!
//! SPLAT! expects four plain-text files per transmitter: a site location
//! file (QTH), an irregular-terrain model parameter file (LRP), and azimuth
//! and elevation antenna pattern files (AZ, EL).

use crate::io::transmitters::Transmitter;
use crate::types::SkyResult;
use std::path::Path;

/// Irregular-terrain model parameters shared by all transmitters of a run.
///
/// Typical Earth dielectric constants and conductivities: salt water 80 /
/// 5.0, good ground 25 / 0.02, fresh water 80 / 0.01, average ground 15 /
/// 0.005, city 5 / 0.001. Radio climate codes: 1 equatorial, 2 continental
/// subtropical, 3 maritime subtropical, 4 desert, 5 continental temperate,
/// 6 maritime temperate over land, 7 maritime temperate over sea.
#[derive(Debug, Clone)]
pub struct SplatParams {
    pub earth_dielectric_constant: f64,
    /// Siemens per meter
    pub earth_conductivity: f64,
    pub radio_climate: u32,
    pub fraction_of_time: f64,
    pub fraction_of_situations: f64,
}

impl Default for SplatParams {
    fn default() -> Self {
        Self {
            earth_dielectric_constant: 15.0, // Average ground
            earth_conductivity: 0.005,
            radio_climate: 6,
            fraction_of_time: 0.5,
            fraction_of_situations: 0.5,
        }
    }
}

/// Site location (QTH) file contents for a transmitter.
/// SPLAT! wants longitude in degrees west, so the sign is flipped.
pub fn build_qth(transmitter: &Transmitter) -> String {
    format!(
        "{}\n{}\n{}\n{}m",
        transmitter.name(),
        transmitter.latitude,
        -transmitter.longitude,
        transmitter.antenna_height
    )
}

/// Irregular-terrain parameter (LRP) file contents for a transmitter
pub fn build_lrp(transmitter: &Transmitter, params: &SplatParams) -> String {
    format!(
        "{} ; Earth Dielectric Constant (Relative permittivity)\n\
         {} ; Earth Conductivity (Siemens per meter)\n\
         301.000 ; Atmospheric Bending Constant (N-units)\n\
         {} ; Frequency in MHz (20 MHz to 20 GHz)\n\
         {} ; Radio Climate\n\
         {} ; Polarization (0 = Horizontal, 1 = Vertical)\n\
         {} ; Fraction of situations\n\
         {} ; Fraction of time\n\
         {} ; ERP in watts",
        params.earth_dielectric_constant,
        params.earth_conductivity,
        transmitter.frequency,
        params.radio_climate,
        transmitter.polarization,
        params.fraction_of_situations,
        params.fraction_of_time,
        transmitter.power_eirp
    )
}

/// Azimuth pattern (AZ) file contents for a transmitter.
///
/// Directional transmitters get a full 360-degree pattern with 0.9 gain
/// inside the half-beamwidth around the bearing and 0.1 outside; a
/// transmitter without bearing or beamwidth data degenerates to `0  0`.
pub fn build_az(transmitter: &Transmitter) -> String {
    let (bearing, beamwidth) = match (transmitter.bearing, transmitter.horizontal_beamwidth) {
        (Some(b), Some(w)) => (b, w),
        _ => return "0  0".to_string(),
    };

    let left = (360.0 - beamwidth / 2.0).round() as i64;
    let right = (beamwidth / 2.0).round() as i64;

    let mut s = format!("{}", bearing);
    for x in 0..360i64 {
        let normal = if left <= x || x <= right { 0.9 } else { 0.1 };
        s.push_str(&format!("\n{}  {}", x, normal));
    }
    s
}

/// Elevation pattern (EL) file contents for a transmitter.
///
/// The pattern spans -10 to +90 degrees; the first `vertical_beamwidth`
/// entries get 0.9 gain and the rest 0.1. A transmitter without bearing,
/// downtilt, or beamwidth data degenerates to `0  0`.
pub fn build_el(transmitter: &Transmitter) -> String {
    let (bearing, downtilt, beamwidth) = match (
        transmitter.bearing,
        transmitter.antenna_downtilt,
        transmitter.vertical_beamwidth,
    ) {
        (Some(b), Some(d), Some(w)) => (b, d, w),
        _ => return "0  0".to_string(),
    };

    let mut s = format!("{}  {}", downtilt, bearing);
    for (counter, x) in (-10..=90i64).enumerate() {
        let normal = if (counter as f64) < beamwidth { 0.9 } else { 0.1 };
        s.push_str(&format!("\n{}  {}", x, normal));
    }
    s
}

/// Write the four propagation-model input files for every transmitter into
/// `output_dir`, creating the directory if needed.
pub fn write_splat_files(
    transmitters: &[Transmitter],
    output_dir: &Path,
    params: &SplatParams,
) -> SkyResult<()> {
    std::fs::create_dir_all(output_dir)?;

    for transmitter in transmitters {
        let name = transmitter.name();
        log::debug!("Writing propagation input files for {}", name);

        let files = [
            ("qth", build_qth(transmitter)),
            ("lrp", build_lrp(transmitter, params)),
            ("az", build_az(transmitter)),
            ("el", build_el(transmitter)),
        ];
        for (ext, contents) in files {
            std::fs::write(output_dir.join(format!("{}.{}", name, ext)), contents)?;
        }
    }

    log::info!(
        "Wrote propagation input files for {} transmitters to {}",
        transmitters.len(),
        output_dir.display()
    );
    Ok(())
}
