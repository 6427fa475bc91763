//! End-to-end runs of the satellite line-of-sight pipeline against
//! deterministic collaborator stubs.

use skyshed::io::{GeoidModel, RasterOps};
use skyshed::{LosParams, LosProcessor, SkyError, SkyResult, SubWindow};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Raster collaborator that fabricates files and records every call
#[derive(Default)]
struct StubRaster {
    calls: Mutex<Vec<String>>,
    /// Working directory observed during the run, for cleanup assertions
    workdir: Mutex<Option<PathBuf>>,
}

impl StubRaster {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RasterOps for StubRaster {
    fn raster_size(&self, _path: &Path) -> SkyResult<(usize, usize)> {
        Ok((30, 30))
    }

    fn value_at(&self, _path: &Path, _lon: f64, _lat: f64) -> SkyResult<f64> {
        Ok(120.0)
    }

    fn extract_window(&self, src: &Path, dst: &Path, window: &SubWindow) -> SkyResult<()> {
        assert!(src.exists(), "source raster should exist");
        *self.workdir.lock().unwrap() = dst.parent().map(Path::to_path_buf);
        std::fs::write(dst, b"window")?;
        self.record(format!(
            "extract {} {},{},{},{}",
            dst.file_name().unwrap().to_string_lossy(),
            window.x_off,
            window.y_off,
            window.x_size,
            window.y_size
        ));
        Ok(())
    }

    fn shade(&self, raster: &Path, azimuth: f64, elevation: f64) -> SkyResult<()> {
        assert!(raster.exists(), "shade target should exist");
        assert!((0.0..360.0).contains(&azimuth));
        assert!((-90.0..=90.0).contains(&elevation));
        self.record(format!(
            "shade {}",
            raster.file_name().unwrap().to_string_lossy()
        ));
        Ok(())
    }

    fn merge(&self, dir: &Path, fragments: &[String], out: &Path) -> SkyResult<()> {
        for fragment in fragments {
            assert!(dir.join(fragment).exists(), "missing fragment {}", fragment);
        }
        std::fs::write(out, b"merged")?;
        self.record(format!("merge {}", fragments.join(",")));
        Ok(())
    }

    fn polygonize(&self, raster: &Path, shapefile: &Path) -> SkyResult<()> {
        assert!(raster.exists());
        std::fs::write(shapefile, b"shapes")?;
        self.record("polygonize".to_string());
        Ok(())
    }
}

struct StubGeoid;

impl GeoidModel for StubGeoid {
    fn height(&self, _lon: f64, _lat: f64) -> SkyResult<f64> {
        Ok(25.0)
    }
}

struct FailingGeoid;

impl GeoidModel for FailingGeoid {
    fn height(&self, _lon: f64, _lat: f64) -> SkyResult<f64> {
        Err(SkyError::GeoidLookup("stub service is down".to_string()))
    }
}

fn params(satellite_lon: f64) -> LosParams {
    LosParams {
        satellite_lon,
        partitions: 3,
        make_shapefile: false,
    }
}

#[test]
fn test_pipeline_produces_merged_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("S36E174.hgt");
    std::fs::write(&input, b"elevation").unwrap();
    let output = dir.path().join("out").join("S36E174-los.tif");

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(158.0));
    let report = processor.compute_satellite_los(&input, &output).unwrap();

    assert_eq!(report.tile_id.to_string(), "S36E174");
    assert_eq!((report.width, report.height), (30, 30));
    assert_eq!(report.windows, 9);
    assert_eq!(std::fs::read(&output).unwrap(), b"merged");
}

#[test]
fn test_pipeline_merges_fragments_in_partition_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("N01E001.hgt");
    std::fs::write(&input, b"elevation").unwrap();
    let output = dir.path().join("los.tif");

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(0.0));
    processor.compute_satellite_los(&input, &output).unwrap();

    let calls = processor_calls(&processor);
    let merge = calls.iter().find(|c| c.starts_with("merge")).unwrap();
    assert_eq!(
        merge,
        "merge 0.tif,1.tif,2.tif,3.tif,4.tif,5.tif,6.tif,7.tif,8.tif"
    );
    // Every sub-window was extracted and shaded exactly once
    assert_eq!(calls.iter().filter(|c| c.starts_with("extract")).count(), 9);
    assert_eq!(calls.iter().filter(|c| c.starts_with("shade")).count(), 9);
    // The first window is the top-left 10x10 corner of the 30x30 tile
    assert!(calls.contains(&"extract 0.tif 0,0,10,10".to_string()));
    assert!(calls.contains(&"extract 8.tif 20,20,10,10".to_string()));
}

#[test]
fn test_pipeline_unpacks_zipped_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("S36E174.SRTMGL3.hgt.zip");
    let file = std::fs::File::create(&input).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("S36E174.hgt", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(b"elevation").unwrap();
    writer.finish().unwrap();
    let output = dir.path().join("los.tif");

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(158.0));
    let report = processor.compute_satellite_los(&input, &output).unwrap();

    assert_eq!(report.tile_id.to_string(), "S36E174");
    assert!(output.exists());
    // The archive itself is left untouched
    assert!(input.exists());
}

#[test]
fn test_pipeline_rejects_archive_without_elevation_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("S36E174.hgt.zip");
    let file = std::fs::File::create(&input).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("readme.txt", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(b"no tiles here").unwrap();
    writer.finish().unwrap();

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(0.0));
    let err = processor
        .compute_satellite_los(&input, dir.path().join("los.tif"))
        .unwrap_err();
    assert!(matches!(err, SkyError::Archive(_)), "{:?}", err);
}

#[test]
fn test_geoid_failure_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("N01E001.hgt");
    std::fs::write(&input, b"elevation").unwrap();
    let output = dir.path().join("los.tif");

    let processor = LosProcessor::new(StubRaster::default(), FailingGeoid, params(0.0));
    let err = processor.compute_satellite_los(&input, &output).unwrap_err();

    assert!(matches!(err, SkyError::GeoidLookup(_)), "{:?}", err);
    assert!(!output.exists(), "no partial output may be left behind");
    // No merge was attempted on the incomplete fragment set
    let calls = processor_calls(&processor);
    assert!(!calls.iter().any(|c| c.starts_with("merge")));
}

#[test]
fn test_working_directory_removed_on_success_and_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("N01E001.hgt");
    std::fs::write(&input, b"elevation").unwrap();

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(0.0));
    processor
        .compute_satellite_los(&input, dir.path().join("ok.tif"))
        .unwrap();
    let workdir = processor_workdir(&processor).expect("stub saw the working directory");
    assert!(!workdir.exists(), "working directory should be cleaned up");

    let failing = LosProcessor::new(StubRaster::default(), FailingGeoid, params(0.0));
    failing
        .compute_satellite_los(&input, dir.path().join("fail.tif"))
        .unwrap_err();
    let workdir = processor_workdir(&failing).expect("stub saw the working directory");
    assert!(!workdir.exists(), "working directory should be cleaned up on failure too");
}

#[test]
fn test_shapefile_derivation_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("N01E001.hgt");
    std::fs::write(&input, b"elevation").unwrap();
    let output = dir.path().join("los.tif");

    let processor = LosProcessor::new(
        StubRaster::default(),
        StubGeoid,
        LosParams {
            satellite_lon: 0.0,
            partitions: 2,
            make_shapefile: true,
        },
    );
    let report = processor.compute_satellite_los(&input, &output).unwrap();

    assert_eq!(report.windows, 4);
    assert!(output.with_extension("shp").exists());
    assert!(processor_calls(&processor).contains(&"polygonize".to_string()));
}

#[test]
fn test_rejects_out_of_range_satellite() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("N01E001.hgt");
    std::fs::write(&input, b"elevation").unwrap();

    let processor = LosProcessor::new(StubRaster::default(), StubGeoid, params(181.0));
    assert!(matches!(
        processor.compute_satellite_los(&input, dir.path().join("los.tif")),
        Err(SkyError::OutOfRange(_))
    ));
}

fn processor_calls<G: GeoidModel>(processor: &LosProcessor<StubRaster, G>) -> Vec<String> {
    processor.tools().calls()
}

fn processor_workdir<G: GeoidModel>(processor: &LosProcessor<StubRaster, G>) -> Option<PathBuf> {
    processor.tools().workdir.lock().unwrap().clone()
}
