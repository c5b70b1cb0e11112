//! Gridding of non-redundant baselines onto a regular (cylinder
//! separation × row separation) lattice.
//!
//! The irregular product list is classified once into an explicit index
//! map ([`GridSpec`]), which stages 2–4 then reuse; the map itself is
//! independently testable.

use itertools::izip;
use log::{debug, trace};
use marlu::io::error::BadArrayShape;

use crate::{
    containers::{VisStream, NPOL},
    error::{GeometryError, RingmapError},
    layout::{Pol, TelescopeLayout},
    ndarray::{s, Array2, Array5, CowArray, Ix2},
    weights::Weighting,
    Complex,
};

/// Tolerance on how far the row-separation ratio may sit from an integer
/// before the array is considered irregular.
const ROW_GRID_TOL: f64 = 1e-3;

/// Discrete grid coordinates of one correlation product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndex {
    /// Polarisation product index, in XX, XY, YX, YY order.
    pub pol: usize,
    /// Cylinder separation index.
    pub cyl: usize,
    /// Signed row-separation bin.
    pub row_bin: isize,
}

/// The regular lattice derived from feed geometry, plus the product →
/// lattice index map.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    /// Grid coordinates per product, in product order.
    pub index: Vec<GridIndex>,
    /// Smallest nonzero row separation \[m\]; the row grid scale.
    pub min_row_sep: f64,
    /// Number of distinct row positions per cylinder.
    pub nfeed: usize,
    /// Number of row-separation bins, `2 * nfeed - 1` (odd, symmetric
    /// about zero).
    pub nvis_1d: usize,
    /// Number of cylinder separations, `max(separation) + 1`.
    pub ncyl: usize,
    /// Number of synthesized beam directions, `2 * ncyl - 1`.
    pub nbeam: usize,
}

impl GridSpec {
    /// Classify every product into its (polarisation, cylinder separation,
    /// row-separation bin) triple and derive the lattice dimensions.
    ///
    /// # Errors
    /// - [`GeometryError::FeedOutOfRange`] if a product references a feed
    ///   the layout does not describe.
    /// - [`GeometryError::DegenerateRows`] if every product has zero row
    ///   separation (a single-row array has no grid scale).
    /// - [`GeometryError::IrregularRowGrid`] if the separations are not
    ///   close to multiples of the smallest one.
    pub fn classify(
        layout: &TelescopeLayout,
        prod: &[(usize, usize)],
    ) -> Result<GridSpec, GeometryError> {
        trace!("start GridSpec::classify");

        let mut pol = Vec::with_capacity(prod.len());
        let mut cyl = Vec::with_capacity(prod.len());
        let mut row_sep = Vec::with_capacity(prod.len());
        for &(i, j) in prod {
            let fi = layout.feed(i)?;
            let fj = layout.feed(j)?;
            pol.push(2 * usize::from(fi.pol == Pol::Y) + usize::from(fj.pol == Pol::Y));
            cyl.push(fi.cyl.abs_diff(fj.cyl));
            row_sep.push(fi.row_m - fj.row_m);
        }

        // The grid scale comes from the nonzero separations only: pairs of
        // feeds at identical rows would collapse it to zero.
        let mut min_sep = f64::INFINITY;
        let mut max_sep = 0.0_f64;
        for &sep in &row_sep {
            let abs = sep.abs();
            if abs > 0.0 {
                min_sep = min_sep.min(abs);
            }
            max_sep = max_sep.max(abs);
        }
        if !min_sep.is_finite() {
            return Err(GeometryError::DegenerateRows { nprod: prod.len() });
        }

        let ratio = max_sep / min_sep;
        if (ratio - ratio.round()).abs() > ROW_GRID_TOL * ratio.max(1.0) {
            return Err(GeometryError::IrregularRowGrid {
                detail: format!(
                    "max/min row separation {ratio} is not close to an integer"
                ),
            });
        }

        // +1 turns the largest separation in grid units into a count of
        // distinct row positions, so bins span [-(nfeed-1), nfeed-1].
        let nfeed = ratio.round() as usize + 1;
        let nvis_1d = 2 * nfeed - 1;
        let ncyl = cyl.iter().max().copied().unwrap_or(0) + 1;
        let nbeam = 2 * ncyl - 1;

        let mut index = Vec::with_capacity(prod.len());
        for (p, c, sep) in izip!(pol, cyl, row_sep) {
            let row_bin = (sep / min_sep).round() as isize;
            if row_bin.unsigned_abs() >= nfeed {
                return Err(GeometryError::IrregularRowGrid {
                    detail: format!(
                        "row separation {sep} m exceeds the derived grid of {nfeed} rows"
                    ),
                });
            }
            index.push(GridIndex {
                pol: p,
                cyl: c,
                row_bin,
            });
        }

        debug!(
            "baseline grid: nfeed={} nvis_1d={} ncyl={} nbeam={} min_row_sep={} m",
            nfeed, nvis_1d, ncyl, nbeam, min_sep
        );
        trace!("end GridSpec::classify");

        Ok(GridSpec {
            index,
            min_row_sep: min_sep,
            nfeed,
            nvis_1d,
            ncyl,
            nbeam,
        })
    }

    /// Index into the row-separation axis for a signed bin. Negative bins
    /// wrap to the top of the axis, matching the FFT frequency layout.
    pub(crate) fn bin_index(&self, row_bin: isize) -> usize {
        row_bin.rem_euclid(self.nvis_1d as isize) as usize
    }
}

/// Dense (frequency, polarisation, ra, cylinder separation, row
/// separation) grids holding the scattered visibility, weight and
/// sample-coefficient values.
pub struct VisGrid {
    /// Accumulated visibility.
    pub vis: Array5<Complex<f64>>,
    /// Accumulated inverse-variance weight.
    pub weight: Array5<f64>,
    /// Accumulated sample coefficient (redundancy / weighting mass).
    pub sample: Array5<f64>,
}

impl VisGrid {
    /// Scatter every product's time series onto the regular lattice.
    ///
    /// Intra-cylinder products are conjugate-completed onto the mirror
    /// bin when `intracyl` is enabled; inter-cylinder products fill only
    /// their own bin, leaving Hermitian completion over the beam axis to
    /// the inverse real transform. Writes are assignments: the product
    /// list is assumed non-redundant, so each cell is owned by at most
    /// one product (mirror fill aside).
    ///
    /// # Errors
    /// - [`BadArrayShape`] if `spec` was not built from this stream's
    ///   product list.
    /// - [`GeometryError::MissingRedundancy`] if natural weighting is
    ///   requested and the layout lacks per-product redundancy counts.
    pub fn pack(
        stream: &VisStream,
        layout: &TelescopeLayout,
        spec: &GridSpec,
        weighting: Weighting,
        intracyl: bool,
    ) -> Result<VisGrid, RingmapError> {
        trace!("start VisGrid::pack");

        let (nfreq, nprod, nra) = stream.vis.dim();
        if spec.index.len() != nprod {
            return Err(BadArrayShape {
                argument: "spec",
                function: "VisGrid::pack",
                expected: format!("index for {nprod} products"),
                received: format!("{}", spec.index.len()),
            }
            .into());
        }
        if weighting == Weighting::Natural && layout.redundancy.len() != nprod {
            return Err(GeometryError::MissingRedundancy {
                nprod,
                nred: layout.redundancy.len(),
            }
            .into());
        }

        let shape = (nfreq, NPOL, nra, spec.ncyl, spec.nvis_1d);
        let mut vis = Array5::<Complex<f64>>::zeros(shape);
        let mut weight = Array5::<f64>::zeros(shape);
        let mut sample = Array5::<f64>::zeros(shape);

        for (bl, idx) in spec.index.iter().enumerate() {
            let vis_bl = stream.vis.slice(s![.., bl, ..]);
            let wgt_bl = stream.weight.slice(s![.., bl, ..]);
            let smp_bl: CowArray<f64, Ix2> = match weighting {
                Weighting::Uniform => Array2::ones((nfreq, nra)).into(),
                Weighting::Natural => {
                    Array2::from_elem((nfreq, nra), layout.redundancy[bl]).into()
                }
                Weighting::InverseVariance => wgt_bl.into(),
            };

            let pos = spec.bin_index(idx.row_bin);
            if idx.cyl == 0 && intracyl {
                let neg = spec.bin_index(-idx.row_bin);
                vis.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&vis_bl);
                vis.slice_mut(s![.., idx.pol, .., idx.cyl, neg])
                    .assign(&vis_bl.mapv(|v| v.conj()));

                weight.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&wgt_bl);
                weight.slice_mut(s![.., idx.pol, .., idx.cyl, neg]).assign(&wgt_bl);

                sample.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&smp_bl);
                sample.slice_mut(s![.., idx.pol, .., idx.cyl, neg]).assign(&smp_bl);
            } else {
                vis.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&vis_bl);
                weight.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&wgt_bl);
                sample.slice_mut(s![.., idx.pol, .., idx.cyl, pos]).assign(&smp_bl);
            }
        }

        if intracyl {
            // Auto-correlations carry no directional information and would
            // bias the zero-spacing weight.
            sample.slice_mut(s![.., .., .., 0, 0]).fill(0.0);
        }

        trace!("end VisGrid::pack");
        Ok(VisGrid {
            vis,
            weight,
            sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::{cross_products, two_cylinder_stream, TWO_CYLINDER_LAYOUT};
    use approx::assert_abs_diff_eq;
    use crate::{layout::Feed, ndarray::Array3};

    #[test]
    fn test_classify_two_cylinder_grid() {
        let prod = cross_products(4);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &prod).unwrap();
        assert_eq!(spec.nfeed, 2);
        assert_eq!(spec.nvis_1d, 3);
        assert_eq!(spec.ncyl, 2);
        assert_eq!(spec.nbeam, 3);
        assert_abs_diff_eq!(spec.min_row_sep, 1.0);

        // feeds: (cyl 0, row 0), (cyl 0, row 1), (cyl 1, row 0), (cyl 1, row 1)
        let expect = [
            GridIndex { pol: 0, cyl: 0, row_bin: -1 }, // (0, 1)
            GridIndex { pol: 0, cyl: 1, row_bin: 0 },  // (0, 2)
            GridIndex { pol: 0, cyl: 1, row_bin: -1 }, // (0, 3)
            GridIndex { pol: 0, cyl: 1, row_bin: 1 },  // (1, 2)
            GridIndex { pol: 0, cyl: 1, row_bin: 0 },  // (1, 3)
            GridIndex { pol: 0, cyl: 0, row_bin: -1 }, // (2, 3)
        ];
        assert_eq!(spec.index, expect);
    }

    #[test]
    fn test_classify_polarisation_products() {
        let feeds = vec![
            Feed { pol: Pol::X, cyl: 0, row_m: 0.0 },
            Feed { pol: Pol::Y, cyl: 0, row_m: 1.0 },
        ];
        let layout = TelescopeLayout::new(feeds);
        let prod = vec![(0, 0), (0, 1), (1, 0), (1, 1)];
        let spec = GridSpec::classify(&layout, &prod).unwrap();
        let pols: Vec<usize> = spec.index.iter().map(|i| i.pol).collect();
        assert_eq!(pols, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_classify_rejects_single_row() {
        let layout = TelescopeLayout::regular_grid(3, 1, 1.0, Pol::X);
        let prod = cross_products(3);
        assert_eq!(
            GridSpec::classify(&layout, &prod),
            Err(GeometryError::DegenerateRows { nprod: 3 })
        );
    }

    #[test]
    fn test_classify_rejects_irregular_rows() {
        let feeds = vec![
            Feed { pol: Pol::X, cyl: 0, row_m: 0.0 },
            Feed { pol: Pol::X, cyl: 0, row_m: 1.0 },
            Feed { pol: Pol::X, cyl: 0, row_m: 2.5 },
        ];
        let layout = TelescopeLayout::new(feeds);
        let prod = cross_products(3);
        assert!(matches!(
            GridSpec::classify(&layout, &prod),
            Err(GeometryError::IrregularRowGrid { .. })
        ));
    }

    #[test]
    fn test_classify_rejects_unknown_feed() {
        let layout = TelescopeLayout::regular_grid(1, 2, 1.0, Pol::X);
        assert_eq!(
            GridSpec::classify(&layout, &[(0, 5)]),
            Err(GeometryError::FeedOutOfRange { feed: 5, nfeeds: 2 })
        );
    }

    #[test]
    fn test_bin_index_wraps_negative_bins() {
        let prod = cross_products(4);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &prod).unwrap();
        assert_eq!(spec.bin_index(0), 0);
        assert_eq!(spec.bin_index(1), 1);
        assert_eq!(spec.bin_index(-1), 2);
    }

    #[test]
    fn test_pack_conjugate_fill() {
        let mut stream = two_cylinder_stream(1, 1);
        // give the first (intra-cylinder) product a complex value
        let v = Complex::new(0.5, -0.25);
        stream.vis[[0, 0, 0]] = v;
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod).unwrap();
        let grid = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::Uniform,
            true,
        )
        .unwrap();

        // product 0 is (0, 1): intra-cylinder, bin -1 → index 2, mirror 1
        assert_abs_diff_eq!(grid.vis[[0, 0, 0, 0, 2]], v);
        assert_abs_diff_eq!(grid.vis[[0, 0, 0, 0, 1]], v.conj());
        assert_eq!(grid.weight[[0, 0, 0, 0, 1]], grid.weight[[0, 0, 0, 0, 2]]);
        assert_eq!(grid.sample[[0, 0, 0, 0, 1]], grid.sample[[0, 0, 0, 0, 2]]);
    }

    #[test]
    fn test_pack_inter_cylinder_no_mirror() {
        let stream = two_cylinder_stream(1, 1);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod).unwrap();
        let grid = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::Uniform,
            true,
        )
        .unwrap();

        // products (0, 3) at bin -1 and (1, 2) at bin +1 each fill only
        // their own side of the cyl=1 row
        assert_abs_diff_eq!(grid.vis[[0, 0, 0, 1, 2]], Complex::new(1.0, 0.0));
        assert_abs_diff_eq!(grid.vis[[0, 0, 0, 1, 1]], Complex::new(1.0, 0.0));
        assert_eq!(grid.sample[[0, 0, 0, 1, 0]], 1.0);
    }

    #[test]
    fn test_pack_zero_spacing_excluded() {
        let stream = two_cylinder_stream(1, 1);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod).unwrap();
        let grid = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::Uniform,
            true,
        )
        .unwrap();
        // intra-cylinder zero-spacing coefficient is zeroed for every
        // pixel, whatever was written there
        assert_eq!(grid.sample.slice(s![.., .., .., 0, 0]).sum(), 0.0);
    }

    #[test]
    fn test_pack_natural_needs_redundancy() {
        let stream = two_cylinder_stream(1, 1);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod).unwrap();
        let result = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::Natural,
            true,
        );
        assert!(matches!(
            result,
            Err(RingmapError::Geometry(GeometryError::MissingRedundancy {
                nprod: 6,
                nred: 0
            }))
        ));
    }

    #[test]
    fn test_pack_inverse_variance_tracks_weight() {
        let mut stream = two_cylinder_stream(2, 3);
        stream.weight[[1, 3, 2]] = 7.0;
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod).unwrap();
        let grid = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::InverseVariance,
            true,
        )
        .unwrap();
        // product 3 is (1, 2): inter-cylinder, bin +1
        assert_eq!(grid.sample[[1, 0, 2, 1, 1]], 7.0);
        assert_eq!(grid.sample[[0, 0, 0, 1, 1]], 1.0);
    }

    #[test]
    fn test_pack_rejects_foreign_spec() {
        let stream = two_cylinder_stream(1, 1);
        let spec = GridSpec::classify(&TWO_CYLINDER_LAYOUT, &stream.prod[..3]).unwrap();
        let result = VisGrid::pack(
            &stream,
            &TWO_CYLINDER_LAYOUT,
            &spec,
            Weighting::Uniform,
            true,
        );
        assert!(matches!(result, Err(RingmapError::BadArrayShape(_))));
    }

    #[test]
    fn test_pack_keeps_autos_without_intracyl_flag() {
        // with intracyl disabled the auto bin is left as written
        let feeds = vec![
            Feed { pol: Pol::X, cyl: 0, row_m: 0.0 },
            Feed { pol: Pol::X, cyl: 0, row_m: 1.0 },
        ];
        let layout = TelescopeLayout::new(feeds);
        let prod = vec![(0, 0), (0, 1)];
        let vis = Array3::from_elem((1, 2, 1), Complex::new(1.0, 0.0));
        let weight = Array3::ones((1, 2, 1));
        let stream =
            VisStream::new(vis, weight, prod, vec![600e6], vec![0.0]).unwrap();
        let spec = GridSpec::classify(&layout, &stream.prod).unwrap();
        let grid =
            VisGrid::pack(&stream, &layout, &spec, Weighting::Uniform, false).unwrap();
        assert_eq!(grid.sample[[0, 0, 0, 0, 0]], 1.0);
    }
}
