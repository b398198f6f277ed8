//! Read-only concurrency: a frozen map answers identically from any number
//! of threads.

use pshx::{Datum, MapBuilder, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

#[test]
fn concurrent_queries_agree() {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    let side = 64_u32;
    let mut locations: Vec<Point<2>> = Vec::new();
    while locations.len() < 200 {
        let p = Point::new([rng.gen_range(0..side), rng.gen_range(0..side)]);
        if !locations.contains(&p) {
            locations.push(p);
        }
    }
    let data: Vec<Datum<2, usize>> = locations
        .iter()
        .enumerate()
        .map(|(i, &location)| Datum {
            location,
            contents: i,
        })
        .collect();
    let map = MapBuilder::new()
        .seed(17)
        .build(data, Point::new([side, side]))
        .expect("build");

    // Serial baseline for a mixed probe set.
    let probes: Vec<Point<2>> = (0..64)
        .map(|_| Point::new([rng.gen_range(0..side), rng.gen_range(0..side)]))
        .collect();
    let baseline: Vec<Option<usize>> = probes.iter().map(|&p| map.get(p).copied()).collect();

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                // One hot point, hammered.
                let hot = locations[0];
                for _ in 0..10_000 {
                    assert_eq!(map.get(hot), Some(&0));
                }
                // And the mixed set, compared against the serial answers.
                for (probe, expected) in probes.iter().zip(&baseline) {
                    assert_eq!(map.get(*probe).copied(), *expected);
                }
            });
        }
    });
}
