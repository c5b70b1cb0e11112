//! Baseline weighting schemes and grid normalization.

use std::{fmt, str::FromStr};

use log::trace;

use crate::{
    error::ConfigError,
    math::invert_no_zero,
    ndarray::{s, Array1, Array3, Array5, Axis},
};

/// How to weight the non-redundant baselines on the grid.
///
/// Selected once at configuration time; each variant knows how its sample
/// coefficient is sourced during packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Weighting {
    /// All baselines given equal weight.
    Uniform,
    /// Each baseline weighted by its redundancy count.
    #[default]
    Natural,
    /// Each baseline weighted by its inverse variance per sample,
    /// according to the radiometer equation.
    InverseVariance,
}

impl FromStr for Weighting {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Weighting, ConfigError> {
        match name {
            "uniform" => Ok(Weighting::Uniform),
            "natural" => Ok(Weighting::Natural),
            "inverse_variance" => Ok(Weighting::InverseVariance),
            _ => Err(ConfigError::UnknownWeighting { name: name.into() }),
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::Uniform => write!(f, "uniform"),
            Weighting::Natural => write!(f, "natural"),
            Weighting::InverseVariance => write!(f, "inverse_variance"),
        }
    }
}

/// Per-cylinder-separation counting weights for collapsing the grid into a
/// per-pixel mass: every nonzero separation appears with both sign
/// conventions, and the intra-cylinder double count is removed when those
/// baselines are included.
pub(crate) fn cylinder_coeff(ncyl: usize, intracyl: bool) -> Array1<f64> {
    let mut coeff = Array1::from_elem(ncyl, 2.0);
    if intracyl {
        coeff[0] -= 1.0;
    }
    coeff
}

/// Rescale the sample-coefficient grid so the coefficient-weighted sum over
/// (cylinder separation, row separation) is unity per output pixel. Pixels
/// with no mass at all stay exactly zero.
pub(crate) fn normalize_samples(sample: &mut Array5<f64>, coeff: &Array1<f64>) {
    trace!("start normalize_samples");

    let (nfreq, npol, nra, _, _) = sample.dim();
    let mut total = Array3::<f64>::zeros((nfreq, npol, nra));
    for (c, &cc) in coeff.iter().enumerate() {
        total += &(sample.slice(s![.., .., .., c, ..]).sum_axis(Axis(3)) * cc);
    }

    for ((f, p, r), &t) in total.indexed_iter() {
        let scale = invert_no_zero(t);
        sample
            .slice_mut(s![f, p, r, .., ..])
            .mapv_inplace(|v| v * scale);
    }

    trace!("end normalize_samples");
}

/// Estimate the RMS thermal noise per (frequency, polarisation, ra) from
/// the normalized sample grid and the accumulated inverse-variance weights.
/// This is a direct sum over the grid; no Fourier step is involved.
pub(crate) fn rms_noise(
    weight: &Array5<f64>,
    sample: &Array5<f64>,
    coeff: &Array1<f64>,
) -> Array3<f64> {
    let (nfreq, npol, nra, ncyl, nvis_1d) = sample.dim();
    let mut rms = Array3::<f64>::zeros((nfreq, npol, nra));
    for ((f, p, r), out) in rms.indexed_iter_mut() {
        let mut acc = 0.0;
        for c in 0..ncyl {
            let mut bin_sum = 0.0;
            for b in 0..nvis_1d {
                let smp = sample[[f, p, r, c, b]];
                bin_sum += invert_no_zero(weight[[f, p, r, c, b]]) * smp * smp;
            }
            acc += coeff[c] * bin_sum;
        }
        *out = acc.sqrt();
    }
    rms
}
