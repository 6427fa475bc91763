//! Selection of the elevation tiles intersected by a set of geometries.

use crate::io::tiles::{tile_ids_covering, TileId};
use crate::types::{BoundingBox, TilePrecision};
use geo::{coord, Geometry, Intersects, Polygon, Rect};
use std::collections::HashSet;

/// Rectangular footprint polygon of a tile's 1-degree cell
pub fn tile_footprint(tile: &TileId) -> Polygon<f64> {
    let b = tile.bounds(TilePrecision::Exact);
    Rect::new(
        coord! { x: b.min_lon, y: b.min_lat },
        coord! { x: b.max_lon, y: b.max_lat },
    )
    .to_polygon()
}

/// The unique candidate tiles whose footprints intersect at least one of the
/// given geometries, in lexicographic order of their identifier.
///
/// Runs a plain double loop with an early exit per tile, O(geometries x
/// candidates). Candidate universes are bounded regional tile sets, so this
/// beats maintaining a spatial index; swap one in behind this signature if
/// that ever stops being true.
pub fn select_intersecting(geometries: &[Geometry<f64>], candidates: &[TileId]) -> Vec<TileId> {
    let unique: HashSet<TileId> = candidates.iter().copied().collect();

    let mut selected: Vec<TileId> = unique
        .into_iter()
        .filter(|tile| {
            let footprint = tile_footprint(tile);
            geometries.iter().any(|geom| footprint.intersects(geom))
        })
        .collect();
    selected.sort_by_key(|t| t.to_string());
    selected
}

/// Tiles needed to cover the given points once each is buffered by
/// `buffer_degrees` on both axes.
///
/// The candidate universe is derived from the buffered points' joint
/// bounding box, so the result is exactly the tiles a coverage run over
/// those transmitters has to fetch.
pub fn covering_tiles_for_points(points: &[(f64, f64)], buffer_degrees: f64) -> Vec<TileId> {
    if points.is_empty() {
        return Vec::new();
    }

    let blobs: Vec<Geometry<f64>> = points
        .iter()
        .map(|&(lon, lat)| {
            Geometry::Rect(Rect::new(
                coord! { x: lon - buffer_degrees, y: lat - buffer_degrees },
                coord! { x: lon + buffer_degrees, y: lat + buffer_degrees },
            ))
        })
        .collect();

    let mut envelope = BoundingBox::new(
        points[0].0 - buffer_degrees,
        points[0].1 - buffer_degrees,
        points[0].0 + buffer_degrees,
        points[0].1 + buffer_degrees,
    );
    for &(lon, lat) in &points[1..] {
        envelope.min_lon = envelope.min_lon.min(lon - buffer_degrees);
        envelope.min_lat = envelope.min_lat.min(lat - buffer_degrees);
        envelope.max_lon = envelope.max_lon.max(lon + buffer_degrees);
        envelope.max_lat = envelope.max_lat.max(lat + buffer_degrees);
    }

    let candidates = tile_ids_covering(&envelope);
    select_intersecting(&blobs, &candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str) -> TileId {
        id.parse().unwrap()
    }

    fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Geometry<f64> {
        Geometry::Rect(Rect::new(
            coord! { x: min_lon, y: min_lat },
            coord! { x: max_lon, y: max_lat },
        ))
    }

    #[test]
    fn test_select_intersecting_filters_and_sorts() {
        let candidates = vec![
            tile("S36E174"),
            tile("S35E173"),
            tile("S48E167"),
            tile("S35E173"), // duplicate
        ];
        let geometries = vec![rect(172.9, -35.8, 174.2, -34.9)];

        let selected = select_intersecting(&geometries, &candidates);
        let names: Vec<String> = selected.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["S35E173", "S36E174"]);
    }

    #[test]
    fn test_select_intersecting_no_duplicates_no_misses() {
        let candidates: Vec<TileId> =
            tile_ids_covering(&BoundingBox::new(166.0, -48.0, 179.0, -34.0));
        let geometries = vec![
            rect(174.0, -37.5, 175.5, -36.5),
            rect(167.5, -45.9, 168.1, -45.2),
        ];

        let selected = select_intersecting(&geometries, &candidates);

        let mut seen = HashSet::new();
        for t in &selected {
            assert!(seen.insert(*t), "duplicate tile {}", t);
            let footprint = tile_footprint(t);
            assert!(
                geometries.iter().any(|g| footprint.intersects(g)),
                "{} does not intersect any input geometry",
                t
            );
        }
        assert!(selected.len() >= 4);
    }

    #[test]
    fn test_select_intersecting_empty_inputs() {
        assert!(select_intersecting(&[], &[tile("N00E000")]).is_empty());
        assert!(select_intersecting(&[rect(0.1, 0.1, 0.2, 0.2)], &[]).is_empty());
    }

    #[test]
    fn test_covering_tiles_for_buffered_points() {
        // Buffer kept clear of whole-degree boundaries so the expected tile
        // set is unambiguous
        let tiles = covering_tiles_for_points(&[(0.5, -0.9)], 0.4);
        let names: Vec<String> = tiles.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["S01E000", "S02E000"]);

        assert!(covering_tiles_for_points(&[], 0.5).is_empty());
    }
}
