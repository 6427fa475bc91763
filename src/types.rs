use serde::{Deserialize, Serialize};

/// Geographic bounding box in WGS84 decimal degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Build a box from two corners, normalizing so that min <= max on each axis
    pub fn new(lon_a: f64, lat_a: f64, lon_b: f64, lat_b: f64) -> Self {
        Self {
            min_lon: lon_a.min(lon_b),
            min_lat: lat_a.min(lat_b),
            max_lon: lon_a.max(lon_b),
            max_lat: lat_a.max(lat_b),
        }
    }

    /// Center of the box as a (longitude, latitude) pair
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Whether the box contains the given point (boundary inclusive)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// The box as `[min_lon, min_lat, max_lon, max_lat]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

/// Padding class applied to a tile's nominal 1-degree bounds.
///
/// Elevation rasters sample past their nominal cell boundary by half a
/// sample pitch, so high-definition (1 arc-second) tiles overlap by
/// 0.5 arc-seconds per side and standard-definition (3 arc-second) tiles
/// by 1.5 arc-seconds per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TilePrecision {
    /// Exact 1-degree cell, no padding
    Exact,
    /// Standard-definition (3 arc-second) raster overlap
    Standard,
    /// High-definition (1 arc-second) raster overlap
    High,
}

impl TilePrecision {
    /// Padding in decimal degrees applied to each side of the cell
    pub fn padding_degrees(&self) -> f64 {
        match self {
            TilePrecision::Exact => 0.0,
            TilePrecision::Standard => crate::io::tiles::STANDARD_DEFINITION_PADDING_DEG,
            TilePrecision::High => crate::io::tiles::HIGH_DEFINITION_PADDING_DEG,
        }
    }
}

/// A ground point referenced to the WGS84 ellipsoid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Height in meters above the ellipsoid (orthometric elevation + geoid height)
    pub height: f64,
}

/// Azimuth/elevation pair describing where to point to see a satellite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAngle {
    /// Degrees clockwise from true north, in [0, 360)
    pub azimuth: f64,
    /// Degrees above the local horizon, in [-90, 90]; negative means below
    pub elevation: f64,
}

/// Rectangular pixel region of a raster, matching GDAL's `-srcwin` convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWindow {
    pub x_off: usize,
    pub y_off: usize,
    pub x_size: usize,
    pub y_size: usize,
}

impl SubWindow {
    pub fn new(x_off: usize, y_off: usize, x_size: usize, y_size: usize) -> Self {
        Self {
            x_off,
            y_off,
            x_size,
            y_size,
        }
    }
}

/// Affine geotransform parameters of a north-up raster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Geographic coordinates of the given (fractional) pixel position
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of the given geographic coordinates.
    /// Assumes a north-up raster (zero rotation terms).
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon - self.top_left_x) / self.pixel_width,
            (lat - self.top_left_y) / self.pixel_height,
        )
    }
}

/// Error types for coverage and visibility processing
#[derive(Debug, thiserror::Error)]
pub enum SkyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("coordinate out of range: {0}")]
    OutOfRange(String),

    #[error("invalid tile ID: {0}")]
    InvalidTileId(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("geoid lookup failed: {0}")]
    GeoidLookup(String),

    #[error("external tool failed: {0}")]
    ExternalTool(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("invalid data format: {0}")]
    InvalidFormat(String),
}

/// Result type for coverage and visibility operations
pub type SkyResult<T> = Result<T, SkyError>;
