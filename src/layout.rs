//! Feed geometry for cylindrical transit arrays.
//!
//! The mapping stages never reach for process-global telescope state: the
//! caller builds a [`TelescopeLayout`] for the dataset at hand and passes it
//! in explicitly. Its lifetime is scoped to one run.

use std::collections::HashMap;

use crate::error::GeometryError;

/// Linear polarisation of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pol {
    /// Aligned with the cylinder axis.
    X,
    /// Perpendicular to the cylinder axis.
    Y,
}

/// A single feed, described by the attributes the gridding stages need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feed {
    /// Polarisation of the feed.
    pub pol: Pol,
    /// Index of the cylinder carrying the feed.
    pub cyl: usize,
    /// Position along the focal line \[m\].
    pub row_m: f64,
}

/// Feed geometry for the current dataset.
///
/// Supplies feed descriptors addressable by feed index, and per-product
/// redundancy counts for [`Weighting::Natural`](crate::Weighting::Natural).
#[derive(Debug, Clone, Default)]
pub struct TelescopeLayout {
    /// Feed descriptors, addressable by feed index.
    pub feeds: Vec<Feed>,
    /// Number of physically-identical baselines collapsed into each
    /// product, addressable by product index. May be left empty when
    /// natural weighting is not in use.
    pub redundancy: Vec<f64>,
}

impl TelescopeLayout {
    /// A layout with the given feeds and no redundancy information.
    pub fn new(feeds: Vec<Feed>) -> TelescopeLayout {
        TelescopeLayout {
            feeds,
            redundancy: vec![],
        }
    }

    /// A regular grid of `nfeed_per_cyl` feeds on each of `ncyl` cylinders,
    /// all of one polarisation, rows spaced `spacing_m` apart. Feed indices
    /// run along each cylinder before moving to the next.
    pub fn regular_grid(
        ncyl: usize,
        nfeed_per_cyl: usize,
        spacing_m: f64,
        pol: Pol,
    ) -> TelescopeLayout {
        let feeds = (0..ncyl)
            .flat_map(|cyl| {
                (0..nfeed_per_cyl).map(move |row| Feed {
                    pol,
                    cyl,
                    row_m: row as f64 * spacing_m,
                })
            })
            .collect();
        TelescopeLayout::new(feeds)
    }

    /// The number of feeds in the layout.
    pub fn num_feeds(&self) -> usize {
        self.feeds.len()
    }

    /// Look up a feed by index.
    ///
    /// # Errors
    /// - [`GeometryError::FeedOutOfRange`] if the layout has no such feed.
    pub fn feed(&self, idx: usize) -> Result<&Feed, GeometryError> {
        self.feeds.get(idx).ok_or(GeometryError::FeedOutOfRange {
            feed: idx,
            nfeeds: self.feeds.len(),
        })
    }

    /// Count, for each product in `prod`, how many feed pairs of this layout
    /// measure a physically-identical baseline (same polarisation pair and
    /// the same displacement, up to conjugation).
    ///
    /// This is a convenience for callers whose upstream does not already
    /// supply redundancy counts; the result can be stored back into
    /// [`TelescopeLayout::redundancy`].
    ///
    /// # Errors
    /// - [`GeometryError::FeedOutOfRange`] if a product references a feed
    ///   the layout does not describe.
    pub fn redundancy_from_products(
        &self,
        prod: &[(usize, usize)],
    ) -> Result<Vec<f64>, GeometryError> {
        // class key: polarisation pair, signed cylinder offset, row offset
        // quantised to micrometres so it can be hashed.
        let class = |a: &Feed, b: &Feed| {
            (
                a.pol,
                b.pol,
                a.cyl as i64 - b.cyl as i64,
                ((a.row_m - b.row_m) * 1e6).round() as i64,
            )
        };

        let mut counts: HashMap<_, f64> = HashMap::new();
        for a in 0..self.feeds.len() {
            for b in a..self.feeds.len() {
                *counts
                    .entry(class(&self.feeds[a], &self.feeds[b]))
                    .or_insert(0.0) += 1.0;
            }
        }

        prod.iter()
            .map(|&(i, j)| {
                let fi = self.feed(i)?;
                let fj = self.feed(j)?;
                let fwd = counts.get(&class(fi, fj)).copied().unwrap_or(0.0);
                let rev = counts.get(&class(fj, fi)).copied().unwrap_or(0.0);
                Ok(fwd.max(rev))
            })
            .collect()
    }
}
