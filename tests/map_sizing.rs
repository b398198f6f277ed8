//! Memory accounting across build sizes.

use pshx::{Datum, MapBuilder, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn build_with_n(n: usize, seed: u64) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    let side = 64_u32;
    let mut locations: Vec<Point<2>> = Vec::new();
    while locations.len() < n {
        let p = Point::new([rng.gen_range(0..side), rng.gen_range(0..side)]);
        if !locations.contains(&p) {
            locations.push(p);
        }
    }
    let data: Vec<Datum<2, u32>> = locations
        .into_iter()
        .enumerate()
        .map(|(i, location)| Datum {
            location,
            contents: i as u32,
        })
        .collect();
    MapBuilder::new()
        .seed(seed)
        .build(data, Point::new([side, side]))
        .expect("build")
        .memory_size()
}

/// More entries never cost less memory in the same domain.
#[test]
fn footprint_grows_with_input() {
    let small = build_with_n(10, 2);
    let medium = build_with_n(100, 2);
    let large = build_with_n(1000, 2);

    assert!(small > 0);
    assert!(small <= medium, "{small} > {medium}");
    assert!(medium <= large, "{medium} > {large}");
}
