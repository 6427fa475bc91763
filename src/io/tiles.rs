use crate::types::{BoundingBox, SkyError, SkyResult, TilePrecision};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Standard-definition (3 arc-second) tiles overlap their nominal cell by
/// 1.5 arc-seconds per side, half the sample pitch.
pub const STANDARD_DEFINITION_PADDING_DEG: f64 = 1.5 / 3600.0;

/// High-definition (1 arc-second) tiles overlap their nominal cell by
/// 0.5 arc-seconds per side.
pub const HIGH_DEFINITION_PADDING_DEG: f64 = 0.5 / 3600.0;

/// Identifier of a 1-degree elevation tile, e.g. `S36E174`.
///
/// The identifier encodes the tile's southwest corner: hemisphere letter and
/// zero-padded two-digit latitude magnitude, then hemisphere letter and
/// zero-padded three-digit longitude magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    /// Southwest corner latitude in whole degrees
    lat: i32,
    /// Southwest corner longitude in whole degrees
    lon: i32,
}

impl TileId {
    /// The tile whose cell covers the given longitude and latitude.
    ///
    /// The southwest corner is the floor of each coordinate, so
    /// `(27.5, 3.64)` maps to `N03E027` and `(27.5, -3.64)` to `S04E027`.
    /// Note that the named tile might not exist in any elevation dataset,
    /// e.g. there is no data for `N90E000`.
    pub fn covering(lon: f64, lat: f64) -> SkyResult<TileId> {
        check_lonlat(lon, lat)?;
        Ok(TileId {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        })
    }

    /// Extract the tile ID from an elevation tile file name, which by
    /// convention starts with the ID, e.g. `S36E174.SRTMGL1.hgt.zip`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> SkyResult<TileId> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SkyError::InvalidTileId(format!("{} has no file name", path.display())))?;
        let stem = name.split('.').next().unwrap_or(name);
        stem.parse()
    }

    /// Southwest corner latitude in whole degrees
    pub fn lat(&self) -> i32 {
        self.lat
    }

    /// Southwest corner longitude in whole degrees
    pub fn lon(&self) -> i32 {
        self.lon
    }

    /// The latitude band prefix of the ID, e.g. `S36` for `S36E174`.
    /// AWS-hosted elevation tiles are grouped into directories by this band.
    pub fn lat_band(&self) -> String {
        let prefix = if self.lat >= 0 { 'N' } else { 'S' };
        format!("{}{:02}", prefix, self.lat.abs())
    }

    /// Longitude-latitude bounds of the tile, optionally padded for the
    /// raster overlap of the given precision class.
    pub fn bounds(&self, precision: TilePrecision) -> BoundingBox {
        let pad = precision.padding_degrees();
        BoundingBox {
            min_lon: self.lon as f64 - pad,
            min_lat: self.lat as f64 - pad,
            max_lon: (self.lon + 1) as f64 + pad,
            max_lat: (self.lat + 1) as f64 + pad,
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat_prefix = if self.lat >= 0 { 'N' } else { 'S' };
        let lon_prefix = if self.lon >= 0 { 'E' } else { 'W' };
        write!(
            f,
            "{}{:02}{}{:03}",
            lat_prefix,
            self.lat.abs(),
            lon_prefix,
            self.lon.abs()
        )
    }
}

impl FromStr for TileId {
    type Err = SkyError;

    fn from_str(s: &str) -> SkyResult<TileId> {
        let invalid = || SkyError::InvalidTileId(s.to_string());

        let bytes = s.as_bytes();
        if bytes.len() != 7 || !s.is_ascii() {
            return Err(invalid());
        }
        if !bytes[1..3].iter().chain(&bytes[4..7]).all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let lat_mag: i32 = s[1..3].parse().map_err(|_| invalid())?;
        let lon_mag: i32 = s[4..7].parse().map_err(|_| invalid())?;
        if lat_mag > 90 || lon_mag > 180 {
            return Err(invalid());
        }
        let lat = match bytes[0] {
            b'N' => lat_mag,
            b'S' => -lat_mag,
            _ => return Err(invalid()),
        };
        let lon = match bytes[3] {
            b'E' => lon_mag,
            b'W' => -lon_mag,
            _ => return Err(invalid()),
        };
        Ok(TileId { lat, lon })
    }
}

/// All 1-degree tile IDs whose cells intersect the given bounding box,
/// enumerated south to north and west to east.
pub fn tile_ids_covering(bbox: &BoundingBox) -> Vec<TileId> {
    let min_lat = bbox.min_lat.floor() as i32;
    let max_lat = bbox.max_lat.ceil() as i32;
    let min_lon = bbox.min_lon.floor() as i32;
    let max_lon = bbox.max_lon.ceil() as i32;

    let mut tiles = Vec::new();
    for lat in min_lat..max_lat {
        for lon in min_lon..max_lon {
            tiles.push(TileId { lat, lon });
        }
    }
    tiles
}

/// Fail with `OutOfRange` unless the pair is a valid WGS84 longitude-latitude
pub(crate) fn check_lonlat(lon: f64, lat: f64) -> SkyResult<()> {
    if !(-180.0..=180.0).contains(&lon) || lon.is_nan() {
        return Err(SkyError::OutOfRange(format!(
            "longitude {} is out of bounds",
            lon
        )));
    }
    if !(-90.0..=90.0).contains(&lat) || lat.is_nan() {
        return Err(SkyError::OutOfRange(format!(
            "latitude {} is out of bounds",
            lat
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_covering_tile_in_each_quadrant() {
        let cases = [
            (27.5, 3.64, "N03E027"),
            (27.5, -3.64, "S04E027"),
            (-27.5, 3.64, "N03W028"),
            (-27.5, -3.64, "S04W028"),
        ];
        for (lon, lat, expected) in cases {
            assert_eq!(TileId::covering(lon, lat).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn test_covering_rejects_out_of_range() {
        assert!(matches!(
            TileId::covering(181.0, 0.0),
            Err(SkyError::OutOfRange(_))
        ));
        assert!(matches!(
            TileId::covering(0.0, -90.5),
            Err(SkyError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_round_trip() {
        for id in ["N03E027", "S36E174", "N00W001", "S48E167", "N90E180"] {
            let tile: TileId = id.parse().unwrap();
            assert_eq!(tile.to_string(), id);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        let bad = [
            "", "N03", "N03E27", "N03E0270", "A03E027", "N03X027", "NxxE027", "N03Exxx", "N91E000",
            "N03E181", "n03e027",
        ];
        for id in bad {
            assert!(
                matches!(id.parse::<TileId>(), Err(SkyError::InvalidTileId(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_exact_bounds() {
        let tile: TileId = "N03E027".parse().unwrap();
        assert_eq!(
            tile.bounds(TilePrecision::Exact).to_array(),
            [27.0, 3.0, 28.0, 4.0]
        );

        let tile: TileId = "N04W027".parse().unwrap();
        assert_eq!(
            tile.bounds(TilePrecision::Exact).to_array(),
            [-27.0, 4.0, -26.0, 5.0]
        );
    }

    #[test]
    fn test_padded_bounds() {
        let tile: TileId = "N03E027".parse().unwrap();

        let hd = tile.bounds(TilePrecision::High);
        assert_relative_eq!(hd.min_lon, 27.0 - 0.5 / 3600.0);
        assert_relative_eq!(hd.max_lat, 4.0 + 0.5 / 3600.0);

        let sd = tile.bounds(TilePrecision::Standard);
        assert_relative_eq!(sd.min_lat, 3.0 - 1.5 / 3600.0);
        assert_relative_eq!(sd.max_lon, 28.0 + 1.5 / 3600.0);
    }

    #[test]
    fn test_bounds_contain_source_point() {
        let samples = [
            (27.5, 3.64),
            (-27.5, -3.64),
            (174.3, -36.9),
            (0.0, 0.5),
            (-0.5, 0.0),
            (179.9, 89.1),
        ];
        for (lon, lat) in samples {
            let tile = TileId::covering(lon, lat).unwrap();
            assert!(
                tile.bounds(TilePrecision::Exact).contains(lon, lat),
                "bounds of {} should contain ({}, {})",
                tile,
                lon,
                lat
            );
        }
    }

    #[test]
    fn test_tile_ids_covering_box() {
        let bbox = BoundingBox::new(-1.1, -0.9, 1.1, 1.1);
        let tiles = tile_ids_covering(&bbox);
        let names: Vec<String> = tiles.iter().map(|t| t.to_string()).collect();
        assert_eq!(tiles.len(), 12);
        for expected in ["S01W002", "S01E001", "N01W002", "N01E001", "N00E000"] {
            assert!(names.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_tile_id_from_path() {
        let tile = TileId::from_path("bingo/S36E174.SRTMGL1.hgt.zip").unwrap();
        assert_eq!(tile.to_string(), "S36E174");

        let tile = TileId::from_path("N01E001.hgt").unwrap();
        assert_eq!(tile.to_string(), "N01E001");

        assert!(TileId::from_path("merged.tif").is_err());
    }
}
