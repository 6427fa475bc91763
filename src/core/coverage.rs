//! RF coverage reports: propagation-model runs and raster post-processing.
//!
//! Thin orchestration of external tools. The propagation modeler (SPLAT!)
//! does the physics; ImageMagick and GDAL reshape its outputs into
//! web-consumable PNG and georeferenced GeoTIFF files.

use crate::io::dem::TileStore;
use crate::io::raster::run_tool;
use crate::io::transmitters::Transmitter;
use crate::types::{BoundingBox, SkyError, SkyResult};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Parameters of a coverage run
#[derive(Debug, Clone)]
pub struct CoverageParams {
    /// Path-loss threshold in dBm beyond which contours are not plotted;
    /// -100 dBm is the floor of most consumer wireless receivers
    pub receiver_sensitivity: f64,
    /// Use the high-definition propagation tools and 1 arc-second terrain
    pub high_definition: bool,
    /// Keep the large intermediate PPM files after PNG conversion
    pub keep_ppm: bool,
    /// Also derive ESRI Shapefile bundles from the coverage GeoTIFFs
    pub make_shapefile: bool,
}

impl Default for CoverageParams {
    fn default() -> Self {
        Self {
            receiver_sensitivity: -110.0,
            high_definition: false,
            keep_ppm: false,
            make_shapefile: false,
        }
    }
}

/// Orchestrates terrain conversion, propagation-model runs, and report
/// post-processing for a set of transmitters
pub struct CoverageProcessor {
    params: CoverageParams,
}

impl CoverageProcessor {
    pub fn new(params: CoverageParams) -> Self {
        Self { params }
    }

    /// Convert every elevation tile in `input_dir` (`.hgt`, optionally
    /// zipped) into the propagation modeler's terrain format in
    /// `output_dir`.
    ///
    /// The converter names its output file itself, so the name is parsed
    /// out of the tool's stdout and the file moved to `output_dir`.
    pub fn process_topography(&self, input_dir: &Path, output_dir: &Path) -> SkyResult<()> {
        fs::create_dir_all(output_dir)?;

        let converter = if self.params.high_definition {
            "srtm2sdf-hd"
        } else {
            "srtm2sdf"
        };
        let sdf_name = Regex::new(r"[\w\-:]+\.sdf").expect("terrain file pattern is valid");

        // Snapshot the directory up front; extraction drops new files into it
        let mut tiles = Vec::new();
        for entry in fs::read_dir(input_dir)? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(".hgt") || name.ends_with(".hgt.zip") {
                    tiles.push((path.clone(), name.to_string()));
                }
            }
        }
        tiles.sort();

        for (path, name) in tiles {
            // The converter only reads plain tiles, so unzip next to the
            // archive and drop the intermediate afterwards
            let (tile_path, unpacked) = if name.ends_with(".zip") {
                (TileStore::extract_tile_archive(&path, input_dir)?, true)
            } else {
                (path.clone(), false)
            };
            let tile_name = tile_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            log::info!("Converting {} to terrain format", tile_name);
            let stdout = run_tool(converter, &[tile_name.as_str()], Some(input_dir))?;

            let produced = sdf_name.find(&stdout).ok_or_else(|| {
                SkyError::ExternalTool(format!(
                    "{} did not report an output file for {}",
                    converter, tile_name
                ))
            })?;
            move_file(
                &input_dir.join(produced.as_str()),
                &output_dir.join(produced.as_str()),
            )?;

            if unpacked {
                fs::remove_file(&tile_path)?;
            }
        }
        Ok(())
    }

    /// Run the propagation modeler for each transmitter whose input files
    /// sit in `input_dir` (alongside the terrain files) and write the
    /// post-processed coverage reports to `output_dir`.
    ///
    /// With `transmitters`, only those are processed; otherwise every site
    /// file found in `input_dir` gets a report. Each report comprises a
    /// site report, a KML overlay, a georeferenced GeoTIFF, and PNG
    /// contour/legend images.
    pub fn compute_coverage(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        transmitters: Option<&[Transmitter]>,
    ) -> SkyResult<()> {
        fs::create_dir_all(output_dir)?;

        let names: Vec<String> = match transmitters {
            Some(ts) => ts.iter().map(|t| t.name()).collect(),
            None => site_names(input_dir)?,
        };
        let modeler = if self.params.high_definition {
            "splat-hd"
        } else {
            "splat"
        };

        for name in &names {
            log::info!("Computing coverage for {}", name);
            let qth = format!("{}.qth", name);
            let ppm = format!("{}.ppm", name);
            let sensitivity = self.params.receiver_sensitivity.to_string();
            run_tool(
                modeler,
                &[
                    "-t",
                    qth.as_str(),
                    "-L",
                    "8.0",
                    "-dbm",
                    "-db",
                    sensitivity.as_str(),
                    "-metric",
                    "-ngs",
                    "-kml",
                    "-o",
                    ppm.as_str(),
                ],
                Some(input_dir),
            )?;

            for suffix in [".ppm", "-ck.ppm", "-site_report.txt", ".kml"] {
                let file = format!("{}{}", name, suffix);
                move_file(&input_dir.join(&file), &output_dir.join(&file))?;
            }
        }

        self.postprocess(output_dir)
    }

    /// Turn raw coverage reports into web-consumable artifacts: PPM
    /// contours become transparent PNGs, KML overlays are repointed at the
    /// PNGs, and each coverage image is georeferenced into a GeoTIFF using
    /// the bounds recorded in its KML.
    fn postprocess(&self, dir: &Path) -> SkyResult<()> {
        // First pass: PPM to PNG with the white background knocked out
        for path in files_with_extension(dir, "ppm")? {
            let name = file_name(&path);
            let png = format!("{}.png", path.file_stem().unwrap_or_default().to_string_lossy());
            log::debug!("Converting {} to {}", name, png);
            run_tool(
                "convert",
                &["-transparent", "#FFFFFF", name.as_str(), png.as_str()],
                Some(dir),
            )?;
            if !self.params.keep_ppm {
                fs::remove_file(&path)?;
            }
        }

        // Second pass: repoint KML overlays and georeference the coverage
        // images with the bounds the modeler recorded
        for path in files_with_extension(dir, "kml")? {
            let kml = fs::read_to_string(&path)?.replace(".ppm", ".png");
            fs::write(&path, &kml)?;

            let bounds = kml_bounds(&kml)?;
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            let (ulx, uly) = (bounds.min_lon.to_string(), bounds.max_lat.to_string());
            let (lrx, lry) = (bounds.max_lon.to_string(), bounds.min_lat.to_string());
            let (png, tif) = (format!("{}.png", stem), format!("{}.tif", stem));
            run_tool(
                "gdal_translate",
                &[
                    "-of",
                    "Gtiff",
                    "-a_ullr",
                    ulx.as_str(),
                    uly.as_str(),
                    lrx.as_str(),
                    lry.as_str(),
                    "-a_srs",
                    "EPSG:4326",
                    png.as_str(),
                    tif.as_str(),
                ],
                Some(dir),
            )?;
        }

        // Optional third pass: vector outlines from the GeoTIFFs
        if self.params.make_shapefile {
            for path in files_with_extension(dir, "tif")? {
                let stem = path.file_stem().unwrap_or_default().to_string_lossy();
                let (tif, shp) = (file_name(&path), format!("{}.shp", stem));
                run_tool(
                    "gdal_polygonize.py",
                    &[tif.as_str(), "-f", "ESRI Shapefile", shp.as_str()],
                    Some(dir),
                )?;
            }
        }
        Ok(())
    }
}

/// Longitude-latitude bounds recorded in a coverage KML's `<LatLonBox>`
pub fn kml_bounds(kml: &str) -> SkyResult<BoundingBox> {
    let capture = |tag: &str| -> SkyResult<f64> {
        let pattern = Regex::new(&format!(r"<{tag}>([0-9-][0-9\.]*)</{tag}>"))
            .expect("KML bounds pattern is valid");
        let text = pattern
            .captures(kml)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                SkyError::InvalidFormat(format!("KML has no <{}> entry in a LatLonBox", tag))
            })?;
        text.as_str()
            .parse()
            .map_err(|e| SkyError::InvalidFormat(format!("bad <{}> value: {}", tag, e)))
    };

    Ok(BoundingBox::new(
        capture("west")?,
        capture("south")?,
        capture("east")?,
        capture("north")?,
    ))
}

/// Stems of the site files in a directory, one per transmitter
fn site_names(dir: &Path) -> SkyResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("qth") {
            names.push(path.file_stem().unwrap_or_default().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn files_with_extension(dir: &Path, ext: &str) -> SkyResult<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

fn move_file(src: &Path, dst: &Path) -> SkyResult<()> {
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}
