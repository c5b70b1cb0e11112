//! Ring-map formation from a stack of non-redundant baselines.
//!
//! This is the driver that runs the four stages in order: classify the
//! products onto the baseline grid, pack the visibilities, normalize the
//! weighting mass, then synthesize a beam per cylinder separation for
//! every frequency channel.

use std::fmt::{self, Display};

use derive_builder::Builder;
use log::{debug, trace};

use crate::{
    containers::{RingMap, VisStream, NPOL},
    error::{ConfigError, RingmapError},
    grid::{GridSpec, VisGrid},
    layout::TelescopeLayout,
    ndarray::{Array4, Array5},
    synthesis::{elevation_axis, synthesize},
    weights::{cylinder_coeff, normalize_samples, rms_noise, Weighting},
};

/// Options for forming a ring map.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct RingmapOptions {
    /// Number of map pixels in the elevation direction.
    #[builder(default = "512")]
    pub npix: usize,

    /// Extent of the elevation axis in sin(zenith angle).
    #[builder(default = "1.0")]
    pub span: f64,

    /// How to weight the non-redundant baselines.
    #[builder(default)]
    pub weighting: Weighting,

    /// Include intra-cylinder baselines in the calculation.
    #[builder(default = "true")]
    pub intracyl: bool,

    /// Only relevant if `intracyl` is false: take the absolute value of
    /// the beams instead of the real component.
    #[builder(default = "true")]
    pub abs_map: bool,

    /// Whether to draw progress bars.
    #[builder(default = "false")]
    pub draw_progress: bool,
}

impl Default for RingmapOptions {
    fn default() -> RingmapOptions {
        RingmapOptions {
            npix: 512,
            span: 1.0,
            weighting: Weighting::default(),
            intracyl: true,
            abs_map: true,
            draw_progress: false,
        }
    }
}

impl RingmapOptions {
    /// Check the options before anything is allocated.
    ///
    /// # Errors
    /// - [`ConfigError::BadNpix`] or [`ConfigError::BadSpan`] for values
    ///   that do not describe a usable elevation grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.npix == 0 {
            return Err(ConfigError::BadNpix { npix: self.npix });
        }
        if !self.span.is_finite() || self.span <= 0.0 {
            return Err(ConfigError::BadSpan { span: self.span });
        }
        Ok(())
    }
}

impl Display for RingmapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Will form {} elevation pixels over a span of {} with {} weighting.",
            self.npix, self.span, self.weighting
        )?;
        writeln!(
            f,
            "{} include intracylinder baselines.",
            if self.intracyl { "Will" } else { "Will not" }
        )?;
        Ok(())
    }
}

/// Form a ring map from a sidereal visibility stream: a series of beams on
/// the meridian per polarisation and right ascension, resolved in
/// elevation.
///
/// The stream is expected to contain non-redundant baselines only; the
/// layout describes the feeds those baselines connect.
///
/// # Examples
///
/// ```rust
/// use ringmap::{
///     make_ringmap, ndarray::Array3, Complex, Pol, RingmapOptionsBuilder, TelescopeLayout,
///     VisStream, Weighting,
/// };
///
/// // two cylinders with two feeds each, and every cross product
/// let layout = TelescopeLayout::regular_grid(2, 2, 0.3048, Pol::X);
/// let prod: Vec<(usize, usize)> = (0..4)
///     .flat_map(|i| ((i + 1)..4).map(move |j| (i, j)))
///     .collect();
/// let nprod = prod.len();
///
/// let stream = VisStream::new(
///     Array3::from_elem((1, nprod, 1), Complex::new(1.0, 0.0)),
///     Array3::ones((1, nprod, 1)),
///     prod,
///     vec![600e6],
///     vec![0.0],
/// )
/// .unwrap();
///
/// let options = RingmapOptionsBuilder::default()
///     .npix(16)
///     .weighting(Weighting::Uniform)
///     .build()
///     .unwrap();
///
/// let ringmap = make_ringmap(&layout, &stream, &options).unwrap();
/// assert_eq!(ringmap.map.dim(), (1, 4, 1, 3, 16));
/// ```
///
/// # Errors
/// - [`ConfigError`](crate::ConfigError) for unusable options, before any
///   allocation.
/// - [`GeometryError`](crate::GeometryError) if the layout admits no
///   regular baseline grid. Dataset-wide; no output is constructed.
/// - [`SynthesisError`](crate::SynthesisError) if a frequency channel
///   fails to synthesize.
pub fn make_ringmap(
    layout: &TelescopeLayout,
    stream: &VisStream,
    options: &RingmapOptions,
) -> Result<RingMap, RingmapError> {
    options.validate()?;
    trace!("start make_ringmap");
    debug!("{options}");

    let spec = GridSpec::classify(layout, &stream.prod)?;

    let mut grid = VisGrid::pack(stream, layout, &spec, options.weighting, options.intracyl)?;

    let coeff = cylinder_coeff(spec.ncyl, options.intracyl);
    normalize_samples(&mut grid.sample, &coeff);
    let rms = rms_noise(&grid.weight, &grid.sample, &coeff);

    let el = elevation_axis(options.npix, options.span);
    let (nfreq, _, nra) = stream.vis.dim();
    let mut map = Array5::zeros((nfreq, NPOL, nra, spec.nbeam, options.npix));
    let mut dirty_beam = Array5::zeros((nfreq, NPOL, nra, spec.nbeam, options.npix));

    // magnitude beams only make sense without the conjugate-completed
    // intracylinder lags
    let abs_beams = options.abs_map && !options.intracyl;
    synthesize(
        &grid,
        &spec,
        &stream.freq_hz,
        &el,
        abs_beams,
        options.draw_progress,
        &mut map,
        &mut dirty_beam,
    )?;

    // the noise estimate is constant along the elevation axis
    let rms = Array4::from_shape_fn((nfreq, NPOL, nra, options.npix), |(f, p, r, _)| {
        rms[[f, p, r]]
    });

    trace!("end make_ringmap");
    Ok(RingMap {
        map,
        dirty_beam,
        rms,
        el,
        freq_hz: stream.freq_hz.clone(),
        ra: stream.ra.clone(),
    })
}
