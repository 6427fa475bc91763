//! Transmitter CSV through to propagation-model input files.

use skyshed::core::{covering_tiles_for_points, write_splat_files};
use skyshed::io::{read_transmitters, transmitter_lonlats};
use skyshed::SplatParams;
use std::io::Write;

const CSV: &str = "\
network_name,site_name,latitude,longitude,antenna_height,polarization,frequency,power_eirp,bearing,horizontal_beamwidth,antenna_downtilt,vertical_beamwidth
Harbour Net,North Head,-36.83,174.81,20,1,5725,100,,,,
Harbour Net,South Ridge,-36.95,174.76,15,0,5725,50,120,35,3,12
";

#[test]
fn test_csv_to_splat_files() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("transmitters.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    file.write_all(CSV.as_bytes()).unwrap();

    let transmitters = read_transmitters(&csv_path).unwrap();
    assert_eq!(transmitters.len(), 2);

    let out = dir.path().join("splat");
    write_splat_files(&transmitters, &out, &SplatParams::default()).unwrap();

    // One file of each kind per transmitter
    for name in ["HarbourNet_NorthHead", "HarbourNet_SouthRidge"] {
        for ext in ["qth", "lrp", "az", "el"] {
            assert!(out.join(format!("{}.{}", name, ext)).exists());
        }
    }

    // Omnidirectional site gets the degenerate patterns
    let az = std::fs::read_to_string(out.join("HarbourNet_NorthHead.az")).unwrap();
    assert_eq!(az, "0  0");

    // Directional site gets a full pattern
    let az = std::fs::read_to_string(out.join("HarbourNet_SouthRidge.az")).unwrap();
    assert_eq!(az.lines().count(), 361);
    assert_eq!(az.lines().next(), Some("120"));

    // The site file flips longitude to degrees west
    let qth = std::fs::read_to_string(out.join("HarbourNet_NorthHead.qth")).unwrap();
    assert!(qth.contains("-174.81"));
}

#[test]
fn test_transmitters_to_tile_cover() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("transmitters.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    file.write_all(CSV.as_bytes()).unwrap();

    let transmitters = read_transmitters(&csv_path).unwrap();
    let tiles = covering_tiles_for_points(&transmitter_lonlats(&transmitters), 0.5);
    let names: Vec<String> = tiles.iter().map(|t| t.to_string()).collect();

    // Both transmitters sit near (-36.9, 174.8); a half-degree buffer
    // reaches the four surrounding cells
    for expected in ["S37E174", "S37E175", "S38E174", "S38E175"] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }
    // Sorted, no duplicates
    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(names, sorted);
}
