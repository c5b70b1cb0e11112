#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! ringmap is a library for forming ring maps — a series of synthesized
//! beams on the meridian — from the non-redundant baselines of a
//! cylindrical transit radio telescope.
//!
//! The engine runs in four stages over a resident visibility stream:
//!
//! 1. classify every feed pair into a (polarisation, cylinder separation,
//!    row separation) triple ([`GridSpec`]),
//! 2. scatter the irregular baseline list onto a dense regular grid,
//!    conjugate-completing intra-cylinder lags ([`VisGrid`]),
//! 3. normalize the configured weighting mass to unity per output pixel,
//! 4. Fourier-synthesize a sky map, dirty beam and noise estimate along
//!    the elevation axis, in parallel over frequency channels.
//!
//! Telescope geometry comes in through a narrow [`TelescopeLayout`]
//! collaborator; file I/O, calibration and job orchestration live
//! upstream of this crate.
//!
//! # Examples
//!
//! ```rust
//! use ringmap::{
//!     make_ringmap, ndarray::Array3, Complex, Pol, RingmapOptionsBuilder, TelescopeLayout,
//!     VisStream, Weighting,
//! };
//!
//! // two cylinders with two feeds each
//! let layout = TelescopeLayout::regular_grid(2, 2, 0.3048, Pol::X);
//!
//! // every cross product, with flat unit visibilities
//! let prod: Vec<(usize, usize)> = (0..4)
//!     .flat_map(|i| ((i + 1)..4).map(move |j| (i, j)))
//!     .collect();
//! let nprod = prod.len();
//! let stream = VisStream::new(
//!     Array3::from_elem((1, nprod, 1), Complex::new(1.0, 0.0)),
//!     Array3::ones((1, nprod, 1)),
//!     prod,
//!     vec![600e6],
//!     vec![0.0],
//! )
//! .unwrap();
//!
//! let options = RingmapOptionsBuilder::default()
//!     .npix(64)
//!     .weighting(Weighting::Uniform)
//!     .build()
//!     .unwrap();
//! let ringmap = make_ringmap(&layout, &stream, &options).unwrap();
//!
//! // (freq, pol, ra, beam, elevation)
//! assert_eq!(ringmap.map.dim(), (1, 4, 1, 3, 64));
//! ```

pub mod containers;
pub mod error;
pub mod grid;
pub mod layout;
pub mod mapmaker;
pub mod math;
pub mod synthesis;
pub mod weights;

#[cfg(test)]
pub(crate) mod test_common;

// re-export the dependencies that appear in this crate's public interface
pub use marlu;
pub use marlu::{ndarray, Complex};

pub use containers::{RingMap, VisStream, NPOL, POL_LABELS};
pub use error::{ConfigError, GeometryError, RingmapError, SynthesisError};
pub use grid::{GridIndex, GridSpec, VisGrid};
pub use layout::{Feed, Pol, TelescopeLayout};
pub use mapmaker::{make_ringmap, RingmapOptions, RingmapOptionsBuilder};
pub use math::invert_no_zero;
pub use weights::Weighting;
