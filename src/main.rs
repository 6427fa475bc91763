use anyhow::Context;
use clap::{Parser, Subcommand};
use skyshed::core::{covering_tiles_for_points, write_splat_files};
use skyshed::io::{read_transmitters, tile_ids_covering, transmitter_lonlats, TileId, TileStore};
use skyshed::{
    BoundingBox, CoverageParams, CoverageProcessor, GdalToolkit, GeoidEvalClient, LosParams,
    LosProcessor, SplatParams,
};
use std::path::PathBuf;
use std::time::Duration;

/// RF coverage and geostationary satellite visibility mapper
#[derive(Parser)]
#[command(name = "skyshed", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the propagation modeler's input files from a transmitters CSV
    Transmitters {
        /// Transmitters CSV file
        input: PathBuf,
        /// Directory for the generated files
        output: PathBuf,
    },

    /// List the elevation tiles covering a bounding box
    Tiles {
        #[arg(allow_hyphen_values = true)]
        min_lon: f64,
        #[arg(allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(allow_hyphen_values = true)]
        max_lon: f64,
        #[arg(allow_hyphen_values = true)]
        max_lat: f64,
    },

    /// Download the elevation tiles needed for a set of transmitters
    DownloadTiles {
        /// Transmitters CSV file
        input: PathBuf,
        /// Tile cache directory (defaults to the user cache)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Buffer around each transmitter in decimal degrees
        #[arg(long, default_value_t = 0.5)]
        buffer: f64,
        /// Fetch 1 arc-second tiles instead of 3 arc-second
        #[arg(long)]
        high_definition: bool,
    },

    /// Convert elevation tiles to the propagation modeler's terrain format
    ProcessTopography {
        /// Directory of elevation tiles
        input: PathBuf,
        /// Directory for the converted terrain files
        output: PathBuf,
        #[arg(long)]
        high_definition: bool,
    },

    /// Compute coverage reports for every transmitter in a directory
    Coverage {
        /// Directory holding site, terrain, and pattern files
        input: PathBuf,
        /// Directory for the coverage reports
        output: PathBuf,
        /// Path-loss plotting threshold in dBm
        #[arg(long, default_value_t = -110.0, allow_hyphen_values = true)]
        receiver_sensitivity: f64,
        #[arg(long)]
        high_definition: bool,
        /// Keep the intermediate PPM images
        #[arg(long)]
        keep_ppm: bool,
        /// Also derive ESRI Shapefile bundles
        #[arg(long)]
        shapefile: bool,
    },

    /// Shade an elevation tile by line of sight to a geostationary satellite
    SatelliteLos {
        /// Elevation tile (.hgt, .hgt.zip, or .hgt.gz)
        input: PathBuf,
        /// Output GeoTIFF path
        output: PathBuf,
        /// Longitude of the satellite in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        satellite_lon: f64,
        /// Grid order; the tile is processed as NxN sub-windows
        #[arg(long, default_value_t = 3)]
        partitions: usize,
        /// Also derive an ESRI Shapefile bundle
        #[arg(long)]
        shapefile: bool,
        /// Geoid service attempts before giving up
        #[arg(long, default_value_t = 3)]
        geoid_attempts: u32,
        /// Geoid service endpoint override
        #[arg(long)]
        geoid_url: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Transmitters { input, output } => {
            let transmitters = read_transmitters(&input)?;
            write_splat_files(&transmitters, &output, &SplatParams::default())?;
        }

        Commands::Tiles {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        } => {
            let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat);
            for tile in tile_ids_covering(&bbox) {
                println!("{}", tile);
            }
        }

        Commands::DownloadTiles {
            input,
            output,
            buffer,
            high_definition,
        } => {
            let transmitters = read_transmitters(&input)?;
            let tiles: Vec<TileId> =
                covering_tiles_for_points(&transmitter_lonlats(&transmitters), buffer);
            let output = output.unwrap_or_else(TileStore::default_cache_dir);
            let downloaded = TileStore::download_tiles(&tiles, &output, high_definition)?;
            println!("Downloaded {} of {} tiles to {}", downloaded.len(), tiles.len(), output.display());
        }

        Commands::ProcessTopography {
            input,
            output,
            high_definition,
        } => {
            let processor = CoverageProcessor::new(CoverageParams {
                high_definition,
                ..Default::default()
            });
            processor.process_topography(&input, &output)?;
        }

        Commands::Coverage {
            input,
            output,
            receiver_sensitivity,
            high_definition,
            keep_ppm,
            shapefile,
        } => {
            let processor = CoverageProcessor::new(CoverageParams {
                receiver_sensitivity,
                high_definition,
                keep_ppm,
                make_shapefile: shapefile,
            });
            processor.compute_coverage(&input, &output, None)?;
        }

        Commands::SatelliteLos {
            input,
            output,
            satellite_lon,
            partitions,
            shapefile,
            geoid_attempts,
            geoid_url,
        } => {
            let url = geoid_url.unwrap_or_else(|| skyshed::io::GEOID_EVAL_URL.to_string());
            let geoid = GeoidEvalClient::with_config(&url, geoid_attempts, Duration::from_secs(30))?;
            let processor = LosProcessor::new(
                GdalToolkit::new(),
                geoid,
                LosParams {
                    satellite_lon,
                    partitions,
                    make_shapefile: shapefile,
                },
            );
            let report = processor
                .compute_satellite_los(&input, &output)
                .with_context(|| format!("line-of-sight run for {}", input.display()))?;
            println!(
                "Shaded {} ({}x{} pixels, {} sub-windows) -> {}",
                report.tile_id,
                report.width,
                report.height,
                report.windows,
                output.display()
            );
        }
    }
    Ok(())
}
