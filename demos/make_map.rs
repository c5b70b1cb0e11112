//! BYO Layout Example
//!
//! Builds a small synthetic two-cylinder array observing a flat unit sky,
//! forms a ring map, and prints a summary of the result.
//!
//! ```bash
//! cargo run --example make_map
//! ```

use ringmap::{
    make_ringmap,
    ndarray::{Array3, Axis},
    Complex, Pol, RingmapOptionsBuilder, TelescopeLayout, VisStream, Weighting, POL_LABELS,
};

fn main() {
    // two cylinders of 16 feeds at 1 ft spacing
    let layout = TelescopeLayout::regular_grid(2, 16, 0.3048, Pol::X);
    let nfeed = layout.num_feeds();

    // every cross product, flat unit sky, unit weights
    let prod: Vec<(usize, usize)> = (0..nfeed)
        .flat_map(|i| ((i + 1)..nfeed).map(move |j| (i, j)))
        .collect();
    let nprod = prod.len();
    let nfreq = 2;
    let nra = 4;
    let vis = Array3::from_elem((nfreq, nprod, nra), Complex::new(1.0, 0.0));
    let weight = Array3::ones((nfreq, nprod, nra));
    let freq_hz = vec![600e6, 700e6];
    let ra: Vec<f64> = (0..nra).map(|r| r as f64 * 360.0 / nra as f64).collect();
    let stream =
        VisStream::new(vis, weight, prod, freq_hz, ra).expect("axes are consistent");

    let options = RingmapOptionsBuilder::default()
        .npix(128)
        .weighting(Weighting::Uniform)
        .draw_progress(true)
        .build()
        .expect("options are valid");
    println!("{options}");

    let ringmap = make_ringmap(&layout, &stream, &options).expect("unable to form ring map");

    let (_, _, _, nbeam, npix) = ringmap.map.dim();
    println!(
        "formed {} beams x {} elevation pixels over {} products",
        nbeam, npix, nprod
    );
    for (pol, label) in POL_LABELS.iter().enumerate() {
        let peak = ringmap
            .map
            .index_axis(Axis(1), pol)
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        println!("{} peak response: {:.6}", label, peak);
    }
}
