use crate::types::{GeoTransform, SkyError, SkyResult, SubWindow};
use gdal::Dataset;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Raster operations the visibility pipeline needs from its collaborators:
/// metadata and value reads, sub-window extraction, per-window shading, and
/// mosaic assembly. The production implementation is [`GdalToolkit`]; tests
/// substitute deterministic stubs.
pub trait RasterOps: Sync {
    /// Pixel width and height of the raster
    fn raster_size(&self, path: &Path) -> SkyResult<(usize, usize)>;

    /// Raster value at the given WGS84 coordinates
    fn value_at(&self, path: &Path, lon: f64, lat: f64) -> SkyResult<f64>;

    /// Copy the given pixel window of `src` into a new raster at `dst`
    fn extract_window(&self, src: &Path, dst: &Path, window: &SubWindow) -> SkyResult<()>;

    /// Overwrite `raster` in place with 8-bit grayscale visibility values
    /// for a light source at the given azimuth and elevation
    fn shade(&self, raster: &Path, azimuth: f64, elevation: f64) -> SkyResult<()>;

    /// Mosaic the named fragments inside `dir`, in the given order, into a
    /// single raster at `out`
    fn merge(&self, dir: &Path, fragments: &[String], out: &Path) -> SkyResult<()>;

    /// Derive an ESRI Shapefile bundle from a raster
    fn polygonize(&self, raster: &Path, shapefile: &Path) -> SkyResult<()>;
}

/// GDAL-backed raster operations.
///
/// Metadata and pixel reads go through the GDAL library; transformations go
/// through the command-line tools (`gdal_translate`, `gdaldem`,
/// `gdalbuildvrt`, `gdal_polygonize.py`), which must be on the PATH.
#[derive(Debug, Default)]
pub struct GdalToolkit;

impl GdalToolkit {
    pub fn new() -> Self {
        GdalToolkit
    }
}

impl RasterOps for GdalToolkit {
    fn raster_size(&self, path: &Path) -> SkyResult<(usize, usize)> {
        let dataset = Dataset::open(path)?;
        Ok(dataset.raster_size())
    }

    fn value_at(&self, path: &Path, lon: f64, lat: f64) -> SkyResult<f64> {
        let dataset = Dataset::open(path)?;
        let transform = GeoTransform::from_gdal(&dataset.geo_transform()?);
        let (width, height) = dataset.raster_size();

        let (col, row) = transform.geo_to_pixel(lon, lat);
        let (col, row) = (col.floor(), row.floor());
        if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
            return Err(SkyError::OutOfRange(format!(
                "({}, {}) lies outside raster {}",
                lon,
                lat,
                path.display()
            )));
        }

        let band = dataset.rasterband(1)?;
        let data = band.read_as::<f32>((col as isize, row as isize), (1, 1), (1, 1), None)?;
        Ok(data.data[0] as f64)
    }

    fn extract_window(&self, src: &Path, dst: &Path, window: &SubWindow) -> SkyResult<()> {
        run_tool(
            "gdal_translate",
            &[
                OsStr::new("-of"),
                OsStr::new("GTiff"),
                OsStr::new("-srcwin"),
                OsStr::new(&window.x_off.to_string()),
                OsStr::new(&window.y_off.to_string()),
                OsStr::new(&window.x_size.to_string()),
                OsStr::new(&window.y_size.to_string()),
                src.as_os_str(),
                dst.as_os_str(),
            ],
            None,
        )?;
        Ok(())
    }

    fn shade(&self, raster: &Path, azimuth: f64, elevation: f64) -> SkyResult<()> {
        // gdaldem cannot write onto its own input, so shade to a sibling
        // file and rename over the original
        let shaded = raster.with_extension("shaded.tif");
        run_tool(
            "gdaldem",
            &[
                OsStr::new("hillshade"),
                OsStr::new("-compute_edges"),
                OsStr::new("-az"),
                OsStr::new(&azimuth.to_string()),
                OsStr::new("-alt"),
                OsStr::new(&elevation.to_string()),
                raster.as_os_str(),
                shaded.as_os_str(),
            ],
            None,
        )?;
        fs::rename(&shaded, raster)?;
        Ok(())
    }

    fn merge(&self, dir: &Path, fragments: &[String], out: &Path) -> SkyResult<()> {
        // gdalbuildvrt + gdal_translate instead of gdal_merge.py, which
        // produces a wrongly sized mosaic for these fragment grids
        let mut args: Vec<&OsStr> = vec![OsStr::new("mosaic.vrt")];
        args.extend(fragments.iter().map(|f| OsStr::new(f.as_str())));
        run_tool("gdalbuildvrt", &args, Some(dir))?;

        run_tool(
            "gdal_translate",
            &[
                OsStr::new("mosaic.vrt"),
                out.as_os_str(),
                OsStr::new("-of"),
                OsStr::new("GTiff"),
            ],
            Some(dir),
        )?;
        Ok(())
    }

    fn polygonize(&self, raster: &Path, shapefile: &Path) -> SkyResult<()> {
        run_tool(
            "gdal_polygonize.py",
            &[
                raster.as_os_str(),
                OsStr::new("-f"),
                OsStr::new("ESRI Shapefile"),
                shapefile.as_os_str(),
            ],
            None,
        )?;
        Ok(())
    }
}

/// Run an external tool, returning its stdout. A nonzero exit status is an
/// `ExternalTool` error carrying the tool's stderr; tool failures are
/// treated as deterministic and are never retried.
pub(crate) fn run_tool<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    cwd: Option<&Path>,
) -> SkyResult<String> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    log::debug!("Running {} {:?}", program, command.get_args());

    let output = command
        .output()
        .map_err(|e| SkyError::ExternalTool(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(SkyError::ExternalTool(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
