//! Error types for ring-map formation.

use marlu::io::error::BadArrayShape;
use thiserror::Error;

/// Anything that can go wrong while forming a ring map.
#[derive(Error, Debug)]
pub enum RingmapError {
    /// An input array did not have the shape implied by its companions.
    #[error(transparent)]
    BadArrayShape(#[from] BadArrayShape),

    /// The requested mapping options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The feed geometry does not admit a regular baseline grid.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A single frequency channel failed to synthesize.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// Errors raised while validating mapping options, before any data is
/// touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The weighting scheme name is not one of the supported set.
    #[error("do not recognize requested weighting: {name}")]
    UnknownWeighting {
        /// The offending scheme name.
        name: String,
    },

    /// `npix` must be a positive number of elevation pixels.
    #[error("npix must be positive, got {npix}")]
    BadNpix {
        /// The offending pixel count.
        npix: usize,
    },

    /// `span` must be a positive, finite elevation extent.
    #[error("span must be positive and finite, got {span}")]
    BadSpan {
        /// The offending span.
        span: f64,
    },
}

/// Errors raised while deriving the baseline grid from feed geometry.
/// These are dataset-wide and abort the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A product referenced a feed the layout does not describe.
    #[error("feed index {feed} out of range for a layout of {nfeeds} feeds")]
    FeedOutOfRange {
        /// The offending feed index.
        feed: usize,
        /// Number of feeds in the layout.
        nfeeds: usize,
    },

    /// Every product has zero row separation, so no row grid scale exists.
    #[error("all {nprod} products have zero row separation; no grid scale can be established")]
    DegenerateRows {
        /// Number of products inspected.
        nprod: usize,
    },

    /// Row separations are not close to multiples of a common spacing.
    #[error("row separations do not form a regular grid: {detail}")]
    IrregularRowGrid {
        /// What exactly failed the regularity check.
        detail: String,
    },

    /// Natural weighting needs one redundancy count per product.
    #[error("natural weighting requires {nprod} redundancy counts, layout has {nred}")]
    MissingRedundancy {
        /// Number of products in the stream.
        nprod: usize,
        /// Number of redundancy counts in the layout.
        nred: usize,
    },
}

/// A failure scoped to a single frequency channel during beam synthesis.
/// Other channels' results are unaffected; the run as a whole still fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The channel frequency admits no wavelength.
    #[error("frequency channel {freq_idx} has non-physical value {freq_hz} Hz")]
    BadFrequency {
        /// Index of the channel in the stream's frequency axis.
        freq_idx: usize,
        /// The offending frequency value.
        freq_hz: f64,
    },
}
