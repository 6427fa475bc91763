//! Piecewise satellite line-of-sight rasters from elevation tiles.
//!
//! The pipeline partitions an elevation tile into a grid of sub-windows,
//! computes the look angle to a geostationary satellite at each sub-window
//! center, shades each sub-window with an external hillshade operation
//! parameterized by that look angle, and mosaics the shaded pieces back
//! into one raster. Bright pixels face the satellite, dark pixels are
//! occluded.

use crate::core::look_angle::compute_look_angles;
use crate::core::partition::{partition, partition_bounds};
use crate::io::dem::TileStore;
use crate::io::geoid::GeoidModel;
use crate::io::raster::RasterOps;
use crate::io::tiles::TileId;
use crate::types::{BoundingBox, GeodeticPoint, SkyError, SkyResult, SubWindow, TilePrecision};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of a satellite line-of-sight run
#[derive(Debug, Clone)]
pub struct LosParams {
    /// Longitude of the geostationary satellite in decimal degrees
    pub satellite_lon: f64,
    /// Grid order n; the tile is processed as n x n sub-windows
    pub partitions: usize,
    /// Also derive an ESRI Shapefile bundle from the merged raster
    pub make_shapefile: bool,
}

impl Default for LosParams {
    fn default() -> Self {
        Self {
            satellite_lon: 0.0,
            partitions: 3,
            make_shapefile: false,
        }
    }
}

/// Summary of a completed line-of-sight run
#[derive(Debug, Clone)]
pub struct LosReport {
    pub tile_id: TileId,
    /// Pixel dimensions of the source tile (and of the merged output)
    pub width: usize,
    pub height: usize,
    /// Number of sub-windows processed
    pub windows: usize,
    pub finished_at: DateTime<Utc>,
}

/// Satellite line-of-sight processor.
///
/// Generic over its collaborators: raster operations and the geoid-height
/// source, so tests can run the full pipeline against deterministic stubs.
pub struct LosProcessor<R, G> {
    tools: R,
    geoid: G,
    params: LosParams,
}

impl<R: RasterOps, G: GeoidModel> LosProcessor<R, G> {
    pub fn new(tools: R, geoid: G, params: LosParams) -> Self {
        Self {
            tools,
            geoid,
            params,
        }
    }

    /// The raster collaborator, mainly so callers can inspect stubs in tests
    pub fn tools(&self) -> &R {
        &self.tools
    }

    /// Produce a satellite line-of-sight raster for one elevation tile.
    ///
    /// `input` names an elevation tile file, optionally compressed
    /// (`.hgt`, `.hgt.zip`, or `.hgt.gz`); the merged 8-bit grayscale
    /// result is written to `output`. All intermediate files live in a
    /// private temporary directory that is removed on every exit path,
    /// success or failure; a failed run leaves no partial output.
    ///
    /// The sub-windows are independent, so they are processed in parallel
    /// and joined before the merge. One failed sub-window aborts the whole
    /// run: a mosaic with missing pieces would look complete while lying.
    pub fn compute_satellite_los<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> SkyResult<LosReport> {
        use rayon::prelude::*;

        let input = input.as_ref();
        let output = output.as_ref();
        let n = self.params.partitions;

        if !(-180.0..=180.0).contains(&self.params.satellite_lon) {
            return Err(SkyError::OutOfRange(format!(
                "satellite longitude {} is out of bounds",
                self.params.satellite_lon
            )));
        }

        let tile_id = TileId::from_path(input)?;
        log::info!(
            "Computing satellite line of sight for {} (satellite at {} degrees, {}x{} grid)",
            tile_id,
            self.params.satellite_lon,
            n,
            n
        );

        let workdir = tempfile::tempdir()?;
        let source = self.resolve_input(input, workdir.path())?;

        let (width, height) = self.tools.raster_size(&source)?;
        log::debug!("Source tile is {}x{} pixels", width, height);

        let windows = partition(width, height, n)?;
        let cells = partition_bounds(&tile_id.bounds(TilePrecision::Exact), n)?;

        // Fan out over the sub-windows; each works on private files. Any
        // failure wins the join and the mosaic is never attempted on an
        // incomplete set.
        (0..windows.len())
            .into_par_iter()
            .map(|i| self.shade_window(&source, workdir.path(), i, &windows[i], &cells[i]))
            .collect::<SkyResult<Vec<()>>>()?;

        let fragments: Vec<String> = (0..windows.len()).map(|i| format!("{}.tif", i)).collect();
        let merged = workdir.path().join("merged.tif");
        self.tools.merge(workdir.path(), &fragments, &merged)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        move_file(&merged, output)?;

        if self.params.make_shapefile {
            self.tools
                .polygonize(output, &output.with_extension("shp"))?;
        }

        log::info!("Line-of-sight raster written to {}", output.display());
        Ok(LosReport {
            tile_id,
            width,
            height,
            windows: windows.len(),
            finished_at: Utc::now(),
        })
    }

    /// Extract a compressed input tile into the working directory, or use
    /// the file as-is when it is not an archive
    fn resolve_input(&self, input: &Path, workdir: &Path) -> SkyResult<PathBuf> {
        let name = input.to_string_lossy();
        if name.ends_with(".zip") || name.ends_with(".gz") {
            log::debug!("Unpacking {}", input.display());
            TileStore::extract_tile_archive(input, workdir)
        } else {
            Ok(input.to_path_buf())
        }
    }

    /// Extract, measure, and shade one sub-window
    fn shade_window(
        &self,
        source: &Path,
        workdir: &Path,
        index: usize,
        window: &SubWindow,
        cell: &BoundingBox,
    ) -> SkyResult<()> {
        let fragment = workdir.join(format!("{}.tif", index));
        self.tools.extract_window(source, &fragment, window)?;

        let (lon, lat) = cell.center();
        let orthometric = self.tools.value_at(&fragment, lon, lat)?;
        let geoid = self.geoid.height(lon, lat)?;

        let point = GeodeticPoint {
            lon,
            lat,
            height: orthometric + geoid,
        };
        let angles = compute_look_angles(&point, self.params.satellite_lon)?;
        if angles.elevation < 0.0 {
            log::warn!(
                "Satellite below the horizon at sub-window {} ({:.4}, {:.4})",
                index,
                lon,
                lat
            );
        }
        log::debug!(
            "Sub-window {}: center ({:.4}, {:.4}), azimuth {:.2}, elevation {:.2}",
            index,
            lon,
            lat,
            angles.azimuth,
            angles.elevation
        );

        self.tools.shade(&fragment, angles.azimuth, angles.elevation)
    }
}

/// Rename, falling back to copy-and-delete across file systems
fn move_file(src: &Path, dst: &Path) -> SkyResult<()> {
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}
