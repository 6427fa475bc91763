//! Input/output: tile addressing, elevation data access, transmitter
//! ingestion, and external-service clients

pub mod dem;
pub mod geoid;
pub mod raster;
pub mod tiles;
pub mod transmitters;

// Re-export main types
pub use dem::TileStore;
pub use geoid::{GeoidEvalClient, GeoidModel, GEOID_EVAL_URL};
pub use raster::{GdalToolkit, RasterOps};
pub use tiles::{tile_ids_covering, TileId};
pub use transmitters::{read_transmitters, transmitter_lonlats, Transmitter};
