//! Exact Euclidean distance transform.
//!
//! Two passes of the one-dimensional squared-distance transform over the
//! lower envelope of parabolas (Felzenszwalb & Huttenlocher), first along
//! columns then along rows. Runs in O(rows * cols).

use hra_core::{GridSpec, Raster, FLOAT_NODATA};

/// Squared distance assigned to cells with no feature in reach.
const FAR: f64 = 1e20;

/// Distance from every cell to the nearest present cell of `mask`,
/// scaled by `sampling_distance`.
///
/// A cell is a feature when its value is exactly 1 and valid. Cells with
/// no feature anywhere in the raster are `f32::INFINITY`.
pub fn distance_transform(mask: &Raster<u8>, sampling_distance: f64) -> Raster<f32> {
    let grid = *mask.grid();
    let (rows, cols) = (grid.rows(), grid.cols());

    let mut sq: Vec<f64> = (0..grid.cell_count())
        .map(|i| if mask.is_present(i) { 0.0 } else { FAR })
        .collect();

    let n = rows.max(cols);
    let mut f = vec![0.0; n];
    let mut d = vec![0.0; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];

    for c in 0..cols {
        for r in 0..rows {
            f[r] = sq[r * cols + c];
        }
        lower_envelope(&f[..rows], &mut d[..rows], &mut v, &mut z);
        for r in 0..rows {
            sq[r * cols + c] = d[r];
        }
    }
    for r in 0..rows {
        let row = &mut sq[r * cols..(r + 1) * cols];
        f[..cols].copy_from_slice(row);
        lower_envelope(&f[..cols], &mut d[..cols], &mut v, &mut z);
        row.copy_from_slice(&d[..cols]);
    }

    let data = sq
        .into_iter()
        .map(|s| {
            if s >= FAR * 0.5 {
                f32::INFINITY
            } else {
                (s.sqrt() * sampling_distance) as f32
            }
        })
        .collect();
    raster_of(grid, data)
}

fn raster_of(grid: GridSpec, data: Vec<f32>) -> Raster<f32> {
    let mut out = Raster::filled(grid, 0.0, Some(FLOAT_NODATA));
    out.data_mut().copy_from_slice(&data);
    out
}

/// One-dimensional squared distance transform of sampled function `f`.
fn lower_envelope(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let intersect = |q: usize, p: usize| -> f64 {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            // z[0] is -inf, so k never underflows.
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let diff = q as f64 - v[k] as f64;
        *out = diff * diff + f[v[k]];
    }
}
