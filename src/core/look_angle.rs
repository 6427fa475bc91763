//! Look angles to geostationary satellites over an ellipsoidal Earth.
//!
//! Implements the algorithm of Soler & Eisemann, "Determination of look
//! angles to geostationary communication satellites": the ground point and
//! the satellite are expressed in Earth-centered rectangular coordinates,
//! the origin is translated to the ground point, and the difference vector
//! is rotated into the point's local east-north-up frame.

use crate::io::tiles::check_lonlat;
use crate::types::{GeodeticPoint, LookAngle, SkyError, SkyResult};

/// WGS84 semimajor axis in meters
pub const WGS84_SEMIMAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;

/// WGS84 eccentricity squared, `2f - f^2`
pub const WGS84_ECCENTRICITY_SQ: f64 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);

/// Distance in meters of a geostationary satellite from the center of the
/// Earth (and hence the center of the WGS84 ellipsoid)
pub const GEOSTATIONARY_RADIUS_M: f64 = 42_164_000.0;

/// Azimuth and elevation of a geostationary satellite at `satellite_lon`
/// as seen from the given ground point.
///
/// Azimuth is returned in degrees in `[0, 360)`, elevation in `[-90, 90]`;
/// a negative elevation means the satellite sits below the local horizon.
/// Pure computation, no I/O. Elevations near the theoretical visibility
/// limit (about 81.3 degrees of longitude away from the sub-satellite
/// point) degrade gracefully to values near zero.
pub fn compute_look_angles(point: &GeodeticPoint, satellite_lon: f64) -> SkyResult<LookAngle> {
    check_lonlat(point.lon, point.lat)?;
    if !(-180.0..=180.0).contains(&satellite_lon) {
        return Err(SkyError::OutOfRange(format!(
            "satellite longitude {} is out of bounds",
            satellite_lon
        )));
    }

    let lam = point.lon.to_radians();
    let phi = point.lat.to_radians();
    let h = point.height;
    let lam_s = satellite_lon.to_radians();
    let r = GEOSTATIONARY_RADIUS_M;
    let a = WGS84_SEMIMAJOR_AXIS_M;
    let e2 = WGS84_ECCENTRICITY_SQ;

    // Prime-vertical radius of curvature at the ground point
    let n_rad = a / (1.0 - e2 * phi.sin().powi(2)).sqrt();

    // Ground point and satellite in Earth-centered rectangular coordinates;
    // the satellite sits on the equatorial plane at the geostationary radius
    let x_p = (n_rad + h) * lam.cos() * phi.cos();
    let y_p = (n_rad + h) * lam.sin() * phi.cos();
    let z_p = (n_rad * (1.0 - e2) + h) * phi.sin();

    let x_s = r * lam_s.cos();
    let y_s = r * lam_s.sin();
    let z_s = 0.0;

    // Translate the origin to the ground point
    let x = x_s - x_p;
    let y = y_s - y_p;
    let z = z_s - z_p;

    // Rotate into the point's local east-north-up frame
    let east = -x * lam.sin() + y * lam.cos();
    let north = -x * phi.sin() * lam.cos() - y * phi.sin() * lam.sin() + z * phi.cos();
    let up = x * phi.cos() * lam.cos() + y * phi.cos() * lam.sin() + z * phi.sin();

    let mut azimuth = east.atan2(north).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    let elevation = up.atan2((east * east + north * north).sqrt()).to_degrees();

    Ok(LookAngle { azimuth, elevation })
}
