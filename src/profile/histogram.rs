use crate::Float;
use rayon::prelude::*;
use std::ops::AddAssign;

/// Counts of `input` over `output.len()` equal bins spanning the closed window
/// `[cut_left, cut_right]`.
///
/// Every worker fills a private histogram over one contiguous tile of the
/// input, then the private histograms are summed column-wise, each worker
/// owning a range of output bins. A value exactly at `cut_right` goes into
/// the last bin. Values outside the window, and NaN, are dropped.
pub fn histogram(input: &[Float], output: &mut [u32], cut_left: Float, cut_right: Float) {
    let n_slices = output.len();
    if n_slices == 0 {
        return;
    }
    let inv_bin_width = n_slices as Float / (cut_right - cut_left);
    let last = n_slices - 1;

    let workers = rayon::current_num_threads().max(1);
    let tile = ((input.len() + workers - 1) / workers).max(1);

    let private: Vec<Vec<u32>> = input
        .par_chunks(tile)
        .map(|chunk| {
            let mut h = vec![0u32; n_slices];
            for &a in chunk {
                if !(a >= cut_left && a <= cut_right) {
                    continue;
                }
                let bin = (((a - cut_left) * inv_bin_width) as usize).min(last);
                h[bin] += 1;
            }
            h
        })
        .collect();

    reduce(&private, output, workers);
}

/// Line density of `input` with each value shared linearly between the two
/// nearest bin centres, over the same closed window as [`histogram`].
///
/// Values between the window edge and the first or last centre go entirely
/// into the outer bin, so the total is still the number of values inside
/// the window.
pub fn smooth_histogram(input: &[Float], output: &mut [Float], cut_left: Float, cut_right: Float) {
    let n_slices = output.len();
    if n_slices == 0 {
        return;
    }
    let inv_bin_width = n_slices as Float / (cut_right - cut_left);
    let last = n_slices - 1;

    let workers = rayon::current_num_threads().max(1);
    let tile = ((input.len() + workers - 1) / workers).max(1);

    let private: Vec<Vec<Float>> = input
        .par_chunks(tile)
        .map(|chunk| {
            let mut h = vec![0.0; n_slices];
            for &a in chunk {
                if !(a >= cut_left && a <= cut_right) {
                    continue;
                }
                // position in units of bins, measured from the first centre
                let x = (a - cut_left) * inv_bin_width - 0.5;
                if x <= 0.0 {
                    h[0] += 1.0;
                } else if x >= last as Float {
                    h[last] += 1.0;
                } else {
                    let bin = (x as usize).min(last - 1);
                    let frac = x - bin as Float;
                    h[bin] += 1.0 - frac;
                    h[bin + 1] += frac;
                }
            }
            h
        })
        .collect();

    reduce(&private, output, workers);
}

// Column-wise sum of the private histograms, one range of output bins per
// worker.
fn reduce<T>(private: &[Vec<T>], output: &mut [T], workers: usize)
where
    T: Copy + Default + AddAssign + Send + Sync,
{
    let n_slices = output.len();
    let bin_tile = ((n_slices + workers - 1) / workers).max(1);
    output
        .par_chunks_mut(bin_tile)
        .enumerate()
        .for_each(|(i, out)| {
            let start = i * bin_tile;
            for v in out.iter_mut() {
                *v = T::default();
            }
            for h in private {
                for (o, c) in out.iter_mut().zip(h[start..].iter()) {
                    *o += *c;
                }
            }
        });
}
