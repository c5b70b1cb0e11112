//! Shared synthetic fixtures for unit tests.

use lazy_static::lazy_static;

use crate::{
    containers::VisStream,
    layout::{Pol, TelescopeLayout},
    ndarray::Array3,
    Complex,
};

lazy_static! {
    /// Two cylinders with two feeds each (rows 0 m and 1 m), all pol X.
    pub(crate) static ref TWO_CYLINDER_LAYOUT: TelescopeLayout =
        TelescopeLayout::regular_grid(2, 2, 1.0, Pol::X);
}

/// Every cross product (i, j) with i < j over `nfeed` feeds.
pub(crate) fn cross_products(nfeed: usize) -> Vec<(usize, usize)> {
    (0..nfeed)
        .flat_map(|i| ((i + 1)..nfeed).map(move |j| (i, j)))
        .collect()
}

/// A stream over [`TWO_CYLINDER_LAYOUT`]'s six cross products with unit
/// visibilities and unit weights, 600 MHz channels and evenly spaced ra.
pub(crate) fn two_cylinder_stream(nfreq: usize, nra: usize) -> VisStream {
    let prod = cross_products(4);
    let nprod = prod.len();
    let vis = Array3::from_elem((nfreq, nprod, nra), Complex::new(1.0, 0.0));
    let weight = Array3::ones((nfreq, nprod, nra));
    let freq_hz = (0..nfreq).map(|f| 600e6 + f as f64 * 1e6).collect();
    let ra = (0..nra).map(|r| r as f64 * 360.0 / nra as f64).collect();
    VisStream::new(vis, weight, prod, freq_hz, ra).unwrap()
}
