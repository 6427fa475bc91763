//! Partitioning of rasters and bounding squares into sub-window grids.

use crate::types::{BoundingBox, SkyError, SkyResult, SubWindow};

/// Split a `width` x `height` pixel raster into an `n` x `n` grid of
/// sub-windows suitable for GDAL's `-srcwin` option.
///
/// Windows are returned row-major, left to right then top to bottom; for
/// `n = 3` the layout is
///
/// ```text
/// -------------
/// | 0 | 1 | 2 |
/// -------------
/// | 3 | 4 | 5 |
/// -------------
/// | 6 | 7 | 8 |
/// -------------
/// ```
///
/// Each axis is divided into spans of `floor(dimension / n)` pixels; the
/// last column and last row absorb the remainder, so the windows tile the
/// raster exactly with no gaps or overlaps.
pub fn partition(width: usize, height: usize, n: usize) -> SkyResult<Vec<SubWindow>> {
    if n == 0 {
        return Err(SkyError::OutOfRange(
            "partition grid order must be at least 1".to_string(),
        ));
    }
    if width < n || height < n {
        return Err(SkyError::OutOfRange(format!(
            "cannot partition a {}x{} raster into {}x{} windows",
            width, height, n, n
        )));
    }

    let (x_span, x_rem) = (width / n, width % n);
    let (y_span, y_rem) = (height / n, height % n);

    let spans = |span: usize, rem: usize| -> Vec<(usize, usize)> {
        (0..n)
            .map(|i| {
                let size = if i == n - 1 { span + rem } else { span };
                (i * span, size)
            })
            .collect()
    };
    let xs = spans(x_span, x_rem);
    let ys = spans(y_span, y_rem);

    let mut windows = Vec::with_capacity(n * n);
    for &(y_off, y_size) in &ys {
        for &(x_off, x_size) in &xs {
            windows.push(SubWindow::new(x_off, y_off, x_size, y_size));
        }
    }
    Ok(windows)
}

/// Split a longitude-latitude bounding square into `n * n` congruent
/// subsquares, enumerated left to right then top to bottom (northernmost
/// row first), matching the window order of [`partition`] on a north-up
/// raster of the same extent.
pub fn partition_bounds(bounds: &BoundingBox, n: usize) -> SkyResult<Vec<BoundingBox>> {
    if n == 0 {
        return Err(SkyError::OutOfRange(
            "partition grid order must be at least 1".to_string(),
        ));
    }

    let delta = (bounds.max_lon - bounds.min_lon) / n as f64;
    let x0 = bounds.min_lon;
    let y0 = bounds.min_lat;

    let mut cells = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            cells.push(BoundingBox {
                min_lon: x0 + j as f64 * delta,
                min_lat: y0 + (n - i - 1) as f64 * delta,
                max_lon: x0 + (j + 1) as f64 * delta,
                max_lat: y0 + (n - i) as f64 * delta,
            });
        }
    }
    Ok(cells)
}
