//! Core processing: look angles, partitioning, tile cover, and the
//! coverage and satellite-visibility pipelines

pub mod cover;
pub mod coverage;
pub mod look_angle;
pub mod partition;
pub mod splat;
pub mod visibility;

// Re-export main types
pub use cover::{covering_tiles_for_points, select_intersecting, tile_footprint};
pub use coverage::{kml_bounds, CoverageParams, CoverageProcessor};
pub use look_angle::{
    compute_look_angles, GEOSTATIONARY_RADIUS_M, WGS84_ECCENTRICITY_SQ, WGS84_FLATTENING,
    WGS84_SEMIMAJOR_AXIS_M,
};
pub use partition::{partition, partition_bounds};
pub use splat::{build_az, build_el, build_lrp, build_qth, write_splat_files, SplatParams};
pub use visibility::{LosParams, LosProcessor, LosReport};
