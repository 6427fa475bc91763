use crate::io::tiles::TileId;
use crate::types::{SkyError, SkyResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Downloader and unpacker for 1-degree elevation tiles
pub struct TileStore;

impl TileStore {
    /// Default on-disk cache for downloaded tiles
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skyshed")
            .join("tiles")
    }

    /// Download the given elevation tiles into `output_dir`, returning the
    /// paths of the tile files. Tiles already present are not fetched again.
    ///
    /// Fails with `Download` only when no tile could be obtained at all;
    /// individual tiles missing from every source are logged and skipped,
    /// since coastal tile sets routinely omit open-ocean cells.
    pub fn download_tiles(
        tiles: &[TileId],
        output_dir: &Path,
        high_definition: bool,
    ) -> SkyResult<Vec<PathBuf>> {
        log::info!("Downloading {} elevation tiles", tiles.len());
        std::fs::create_dir_all(output_dir)?;

        let mut downloaded = Vec::new();
        for tile in tiles {
            let output_path = output_dir.join(format!("{}.hgt", tile));

            if output_path.exists() {
                log::info!("Tile {} already cached, skipping download", tile);
                downloaded.push(output_path);
                continue;
            }

            if Self::try_download_from_sources(tile, &output_path, high_definition)? {
                log::info!("Successfully downloaded {}", tile);
                downloaded.push(output_path);
            } else {
                log::warn!("Failed to download {} from all sources", tile);
            }
        }

        if downloaded.is_empty() {
            return Err(SkyError::Download(
                "no elevation tiles could be downloaded from any source; \
                 check the network connection or provide tile files manually"
                    .to_string(),
            ));
        }

        Ok(downloaded)
    }

    /// Try each known source in order of preference
    fn try_download_from_sources(
        tile: &TileId,
        output_path: &Path,
        high_definition: bool,
    ) -> SkyResult<bool> {
        let sources = Self::source_urls(tile, high_definition);

        for (i, url) in sources.iter().enumerate() {
            log::info!("Attempting download from source {} of {}: {}", i + 1, sources.len(), url);
            match Self::download_and_extract(url, output_path) {
                Ok(()) => return Ok(true),
                Err(e) => {
                    log::warn!("Source {} failed: {}", i + 1, e);
                }
            }
        }
        Ok(false)
    }

    /// Candidate URLs for a tile, most reliable first.
    ///
    /// The AWS terrain tile mirror serves gzipped 1 arc-second tiles grouped
    /// by latitude band and needs no authentication, so it leads; the NASA
    /// MEASURES archive follows with the resolution-specific products.
    fn source_urls(tile: &TileId, high_definition: bool) -> Vec<String> {
        let product = if high_definition { "SRTMGL1" } else { "SRTMGL3" };
        vec![
            format!(
                "https://s3.amazonaws.com/elevation-tiles-prod/skadi/{}/{}.hgt.gz",
                tile.lat_band(),
                tile
            ),
            format!(
                "https://e4ftl01.cr.usgs.gov/MEASURES/{product}.003/2000.02.11/{tile}.{product}.hgt.zip",
            ),
        ]
    }

    /// Download one URL with a bounded retry and unpack the payload
    fn download_and_extract(url: &str, output_path: &Path) -> SkyResult<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("skyshed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkyError::Download(format!("failed to create HTTP client: {}", e)))?;

        let max_retries = 3;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            log::debug!("Download attempt {} of {}", attempt, max_retries);
            match Self::download_once(&client, url, output_path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SkyError::Download("download failed after all retries".to_string())))
    }

    fn download_once(
        client: &reqwest::blocking::Client,
        url: &str,
        output_path: &Path,
    ) -> SkyResult<()> {
        let response = client
            .get(url)
            .send()
            .map_err(|e| SkyError::Download(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SkyError::Download(format!(
                "HTTP {} for {}",
                response.status().as_u16(),
                url
            )));
        }

        let content = response
            .bytes()
            .map_err(|e| SkyError::Download(format!("failed to read response body: {}", e)))?;

        // Anything this small is an error page, not elevation data
        if content.len() < 1024 {
            return Err(SkyError::Download(format!(
                "payload too small ({} bytes), likely an error page",
                content.len()
            )));
        }

        if Self::is_gzip(&content) {
            Self::extract_gzip(&content, output_path)?;
        } else if Self::is_zip(&content) {
            Self::extract_zip(&content, output_path)?;
        } else {
            std::fs::write(output_path, &content)?;
        }

        let metadata = std::fs::metadata(output_path)?;
        if metadata.len() == 0 {
            return Err(SkyError::Download("output file is empty".to_string()));
        }
        Ok(())
    }

    /// Unpack a local `.hgt.zip` or `.hgt.gz` tile archive into `dest_dir`,
    /// returning the path of the unpacked `.hgt` file. The archive file name
    /// must carry the tile ID, which names the expected payload.
    pub fn extract_tile_archive(archive: &Path, dest_dir: &Path) -> SkyResult<PathBuf> {
        let tile = TileId::from_path(archive)?;
        let target = dest_dir.join(format!("{}.hgt", tile));

        let data = std::fs::read(archive)?;
        if Self::is_gzip(&data) {
            Self::extract_gzip(&data, &target)?;
        } else if Self::is_zip(&data) {
            Self::extract_zip(&data, &target)?;
        } else {
            return Err(SkyError::Archive(format!(
                "{} is neither a zip nor a gzip archive",
                archive.display()
            )));
        }

        if !target.exists() {
            return Err(SkyError::Archive(format!(
                "{}.hgt missing after extracting {}",
                tile,
                archive.display()
            )));
        }
        Ok(target)
    }

    fn is_gzip(content: &[u8]) -> bool {
        content.len() >= 2 && content[0] == 0x1F && content[1] == 0x8B
    }

    fn is_zip(content: &[u8]) -> bool {
        content.len() >= 4 && content[0..4] == [0x50, 0x4B, 0x03, 0x04]
    }

    /// Extract an elevation file from a ZIP archive
    fn extract_zip(zip_data: &[u8], output_path: &Path) -> SkyResult<()> {
        use std::io::Cursor;
        use zip::ZipArchive;

        let reader = Cursor::new(zip_data);
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| SkyError::Archive(format!("failed to open ZIP archive: {}", e)))?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| SkyError::Archive(format!("failed to read ZIP entry {}: {}", i, e)))?;

            if file.name().ends_with(".hgt") {
                log::debug!("Extracting {}", file.name());
                let mut buffer = Vec::new();
                std::io::copy(&mut file, &mut buffer)?;
                std::fs::write(output_path, buffer)?;
                return Ok(());
            }
        }

        Err(SkyError::Archive(
            "no elevation file found in ZIP archive".to_string(),
        ))
    }

    /// Decompress a gzipped elevation file
    fn extract_gzip(gzip_data: &[u8], output_path: &Path) -> SkyResult<()> {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let mut decoder = GzDecoder::new(gzip_data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SkyError::Archive(format!("failed to decompress gzip data: {}", e)))?;

        if decompressed.is_empty() {
            return Err(SkyError::Archive(
                "decompressed elevation file is empty".to_string(),
            ));
        }

        std::fs::write(output_path, decompressed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_urls() {
        let tile: TileId = "S37E175".parse().unwrap();
        let urls = TileStore::source_urls(&tile, false);
        assert_eq!(
            urls[0],
            "https://s3.amazonaws.com/elevation-tiles-prod/skadi/S37/S37E175.hgt.gz"
        );
        assert!(urls[1].contains("SRTMGL3.003"));
        assert!(urls[1].ends_with("S37E175.SRTMGL3.hgt.zip"));

        let urls = TileStore::source_urls(&tile, true);
        assert!(urls[1].contains("SRTMGL1"));
    }

    #[test]
    fn test_magic_byte_detection() {
        assert!(TileStore::is_gzip(&[0x1F, 0x8B, 0x08, 0x00]));
        assert!(!TileStore::is_gzip(&[0x50, 0x4B, 0x03, 0x04]));
        assert!(TileStore::is_zip(&[0x50, 0x4B, 0x03, 0x04, 0x00]));
        assert!(!TileStore::is_zip(b"plain data"));
    }

    #[test]
    fn test_extract_gzip_archive() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("N01E001.hgt.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"elevation samples").unwrap();
        std::fs::write(&archive_path, encoder.finish().unwrap()).unwrap();

        let extracted = TileStore::extract_tile_archive(&archive_path, dir.path()).unwrap();
        assert_eq!(extracted, dir.path().join("N01E001.hgt"));
        assert_eq!(std::fs::read(extracted).unwrap(), b"elevation samples");
    }

    #[test]
    fn test_extract_zip_archive() {
        use zip::write::FileOptions;
        use zip::ZipWriter;

        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("S36E174.SRTMGL3.hgt.zip");

        let file = std::fs::File::create(&archive_path).unwrap();
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("S36E174.hgt", FileOptions::default())
            .unwrap();
        writer.write_all(b"elevation samples").unwrap();
        writer.finish().unwrap();

        let extracted = TileStore::extract_tile_archive(&archive_path, dir.path()).unwrap();
        assert_eq!(extracted, dir.path().join("S36E174.hgt"));
    }

    #[test]
    fn test_extract_rejects_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("N01E001.hgt.zip");
        std::fs::write(&path, b"not an archive at all, much too plain").unwrap();

        assert!(matches!(
            TileStore::extract_tile_archive(&path, dir.path()),
            Err(SkyError::Archive(_))
        ));
    }
}
