//! Fourier synthesis of the sky map along the elevation axis.
//!
//! Each frequency channel is self-contained, so the channel loop runs on
//! the rayon pool; stages 1–3 have already produced the packed, normalized
//! grids this stage reads.

use std::{f64::consts::PI, sync::Arc};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::trace;
use marlu::{constants::VEL_C, rayon};
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::{
    error::{RingmapError, SynthesisError},
    grid::{GridSpec, VisGrid},
    math::fftfreq,
    ndarray::{parallel::prelude::*, s, Array1, Array2, Array5, Axis},
    Complex,
};

/// The fixed elevation output grid, `span * linspace(-1, 1, npix)` in
/// sin(zenith angle).
pub fn elevation_axis(npix: usize, span: f64) -> Array1<f64> {
    Array1::linspace(-1.0, 1.0, npix) * span
}

/// Inverse DFT from the non-negative half spectrum, assuming Hermitian
/// symmetry across the full window. Unnormalised, which is exactly the
/// length-scaled inverse real transform the map calls for.
fn irfft_scaled(ifft: &Arc<dyn Fft<f64>>, half: &[Complex<f64>], buf: &mut [Complex<f64>]) {
    let n = buf.len();
    buf[..half.len()].copy_from_slice(half);
    for k in 1..half.len() {
        buf[n - k] = half[k].conj();
    }
    ifft.process(buf);
}

/// Synthesize the sky map and dirty beam for every frequency channel,
/// writing into the caller's (frequency, polarisation, ra, beam,
/// elevation) arrays.
///
/// # Errors
/// - [`SynthesisError::BadFrequency`] if a channel frequency admits no
///   wavelength. The failure is scoped to that channel; the others are
///   unaffected by it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn synthesize(
    grid: &VisGrid,
    spec: &GridSpec,
    freq_hz: &[f64],
    el: &Array1<f64>,
    abs_beams: bool,
    draw_progress: bool,
    map: &mut Array5<f64>,
    dirty_beam: &mut Array5<f64>,
) -> Result<(), RingmapError> {
    trace!("start synthesize");

    let (_, npol, nra, ncyl, nvis_1d) = grid.sample.dim();
    let npix = el.len();
    let nbeam = spec.nbeam;

    // physical row separation represented by each bin
    let vis_pos_1d = fftfreq(nvis_1d, 1.0 / (nvis_1d as f64 * spec.min_row_sep));

    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(nbeam);

    let draw_target = if draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let progress = ProgressBar::with_draw_target(Some(freq_hz.len() as u64), draw_target);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(
                "{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:3}% ({eta:5})",
            )
            .unwrap()
            .progress_chars("=> "),
    );
    progress.set_message("beam synthesis");

    let result = map
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(dirty_beam.axis_iter_mut(Axis(0)))
        .zip(grid.vis.axis_iter(Axis(0)))
        .zip(grid.sample.axis_iter(Axis(0)))
        .zip(freq_hz.par_iter())
        .enumerate()
        .try_for_each(
            |(freq_idx, ((((mut map_f, mut beam_f), vis_f), smp_f), &fr))| {
                if !fr.is_finite() || fr <= 0.0 {
                    return Err(SynthesisError::BadFrequency {
                        freq_idx,
                        freq_hz: fr,
                    });
                }
                let lambda = VEL_C / fr;

                // phase steering matrix over (row separation bin, elevation)
                let pa = Array2::from_shape_fn((nvis_1d, npix), |(b, p)| {
                    Complex::from_polar(1.0, 2.0 * PI * vis_pos_1d[b] * el[p] / lambda)
                });

                let mut half = vec![Complex::new(0.0, 0.0); ncyl];
                let mut buf = vec![Complex::new(0.0, 0.0); nbeam];
                for p in 0..npol {
                    for r in 0..nra {
                        let smp_pr = smp_f.slice(s![p, r, .., ..]);
                        let vis_pr = vis_f.slice(s![p, r, .., ..]);
                        let weighted_vis = Array2::from_shape_fn((ncyl, nvis_1d), |(c, b)| {
                            vis_pr[[c, b]] * smp_pr[[c, b]]
                        });
                        let smp_complex = smp_pr.mapv(|x| Complex::new(x, 0.0));

                        // steer onto the elevation grid, then transform the
                        // cylinder axis into beam directions
                        let map_spec = weighted_vis.dot(&pa);
                        let beam_spec = smp_complex.dot(&pa);

                        for pix in 0..npix {
                            for c in 0..ncyl {
                                half[c] = map_spec[[c, pix]];
                            }
                            irfft_scaled(&ifft, &half, &mut buf);
                            for (beam, value) in buf.iter().enumerate() {
                                map_f[[p, r, beam, pix]] =
                                    if abs_beams { value.re.abs() } else { value.re };
                            }

                            for c in 0..ncyl {
                                half[c] = beam_spec[[c, pix]];
                            }
                            irfft_scaled(&ifft, &half, &mut buf);
                            for (beam, value) in buf.iter().enumerate() {
                                beam_f[[p, r, beam, pix]] =
                                    if abs_beams { value.re.abs() } else { value.re };
                            }
                        }
                    }
                }
                progress.inc(1);
                Ok(())
            },
        );

    progress.finish();
    trace!("end synthesize");
    result.map_err(RingmapError::from)
}
