//! Skyshed: RF coverage and geostationary satellite visibility mapping
//!
//! This library orchestrates external radio-propagation and raster tools
//! (SPLAT!, GDAL, ImageMagick) to turn transmitter records and digital
//! elevation tiles into coverage and satellite line-of-sight maps. The
//! geodetic parts (tile addressing, tile-cover selection, look-angle
//! computation, raster partitioning) are implemented here; propagation
//! physics and raster codecs stay in the external tools.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use crate::types::{
    BoundingBox, GeoTransform, GeodeticPoint, LookAngle, SkyError, SkyResult, SubWindow,
    TilePrecision,
};

pub use crate::io::{GdalToolkit, GeoidEvalClient, GeoidModel, RasterOps, TileId, TileStore};

pub use crate::core::{
    compute_look_angles, covering_tiles_for_points, partition, partition_bounds,
    select_intersecting, CoverageParams, CoverageProcessor, LosParams, LosProcessor, LosReport,
    SplatParams,
};
