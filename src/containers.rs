//! In-memory containers for the visibility input and the ring-map output.
//!
//! File formats and (de)serialization live upstream; the engine only needs
//! arrays that are already resident and indexable.

use marlu::io::error::BadArrayShape;

use crate::{
    ndarray::{Array1, Array3, Array4, Array5},
    Complex,
};

/// Polarisation product labels of the output map, in emitted order.
pub const POL_LABELS: [&str; 4] = ["XX", "XY", "YX", "YY"];

/// Number of polarisation products.
pub const NPOL: usize = POL_LABELS.len();

/// A stack of non-redundant cross-correlation products, resolved in
/// frequency and right ascension.
#[derive(Debug, Clone)]
pub struct VisStream {
    /// Complex visibility, shape (frequency, product, ra).
    pub vis: Array3<Complex<f64>>,
    /// Inverse-variance weight, shape (frequency, product, ra).
    pub weight: Array3<f64>,
    /// Feed index pairs defining the product order.
    pub prod: Vec<(usize, usize)>,
    /// Centre frequency of each channel \[Hz\].
    pub freq_hz: Vec<f64>,
    /// Right ascension of each sample \[deg\].
    pub ra: Vec<f64>,
}

impl VisStream {
    /// Bundle visibilities with their axes, checking that every axis
    /// agrees on its length.
    ///
    /// # Errors
    /// - [`BadArrayShape`] if `weight` is not co-shaped with `vis`, or an
    ///   axis description does not match the corresponding `vis` dimension.
    pub fn new(
        vis: Array3<Complex<f64>>,
        weight: Array3<f64>,
        prod: Vec<(usize, usize)>,
        freq_hz: Vec<f64>,
        ra: Vec<f64>,
    ) -> Result<VisStream, BadArrayShape> {
        let vis_dims = vis.dim();
        if weight.dim() != vis_dims {
            return Err(BadArrayShape {
                argument: "weight",
                function: "VisStream::new",
                expected: format!("{vis_dims:?}"),
                received: format!("{:?}", weight.dim()),
            });
        }
        if freq_hz.len() != vis_dims.0 {
            return Err(BadArrayShape {
                argument: "freq_hz",
                function: "VisStream::new",
                expected: format!("vis_dims.0={}", vis_dims.0),
                received: format!("{}", freq_hz.len()),
            });
        }
        if prod.len() != vis_dims.1 {
            return Err(BadArrayShape {
                argument: "prod",
                function: "VisStream::new",
                expected: format!("vis_dims.1={}", vis_dims.1),
                received: format!("{}", prod.len()),
            });
        }
        if ra.len() != vis_dims.2 {
            return Err(BadArrayShape {
                argument: "ra",
                function: "VisStream::new",
                expected: format!("vis_dims.2={}", vis_dims.2),
                received: format!("{}", ra.len()),
            });
        }
        Ok(VisStream {
            vis,
            weight,
            prod,
            freq_hz,
            ra,
        })
    }

    /// Number of frequency channels.
    pub fn num_freqs(&self) -> usize {
        self.vis.dim().0
    }

    /// Number of correlation products.
    pub fn num_products(&self) -> usize {
        self.vis.dim().1
    }

    /// Number of right-ascension samples.
    pub fn num_ra(&self) -> usize {
        self.vis.dim().2
    }
}

/// The synthesized map: a series of beams on the meridian per frequency,
/// polarisation and right ascension, resolved in elevation.
#[derive(Debug, Clone)]
pub struct RingMap {
    /// Sky intensity, shape (frequency, polarisation, ra, beam, elevation).
    pub map: Array5<f64>,
    /// Response to a unit sky through the same weighting, co-shaped with
    /// `map`.
    pub dirty_beam: Array5<f64>,
    /// RMS thermal noise estimate, shape (frequency, polarisation, ra,
    /// elevation).
    pub rms: Array4<f64>,
    /// Elevation axis, `span * linspace(-1, 1, npix)` in sin(zenith angle).
    pub el: Array1<f64>,
    /// Centre frequency of each channel \[Hz\].
    pub freq_hz: Vec<f64>,
    /// Right ascension of each sample \[deg\].
    pub ra: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndarray::Array3;

    fn unit_vis(dims: (usize, usize, usize)) -> Array3<Complex<f64>> {
        Array3::from_elem(dims, Complex::new(1.0, 0.0))
    }

    #[test]
    fn test_vis_stream_accepts_consistent_axes() {
        let stream = VisStream::new(
            unit_vis((2, 3, 4)),
            Array3::ones((2, 3, 4)),
            vec![(0, 0), (0, 1), (1, 1)],
            vec![500e6, 600e6],
            vec![0.0, 90.0, 180.0, 270.0],
        )
        .unwrap();
        assert_eq!(stream.num_freqs(), 2);
        assert_eq!(stream.num_products(), 3);
        assert_eq!(stream.num_ra(), 4);
    }

    #[test]
    fn test_vis_stream_rejects_mismatched_weight() {
        let result = VisStream::new(
            unit_vis((2, 3, 4)),
            Array3::ones((2, 3, 3)),
            vec![(0, 0), (0, 1), (1, 1)],
            vec![500e6, 600e6],
            vec![0.0, 90.0, 180.0, 270.0],
        );
        let err = result.unwrap_err();
        assert_eq!(err.argument, "weight");
    }

    #[test]
    fn test_vis_stream_rejects_short_prod_list() {
        let result = VisStream::new(
            unit_vis((1, 3, 1)),
            Array3::ones((1, 3, 1)),
            vec![(0, 1)],
            vec![600e6],
            vec![0.0],
        );
        assert_eq!(result.unwrap_err().argument, "prod");
    }
}
