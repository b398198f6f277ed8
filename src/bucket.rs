//! Partitioning input points into offset-table buckets.
//!
//! Every input point selects one offset-table entry through the secondary
//! hash; the points sharing an entry form a bucket and must be placed
//! together with a single offset. Buckets are solved in descending size
//! order: the hardest placements happen while the value table is still
//! mostly empty, and the tail of singleton buckets is near-trivial.

use crate::params::Params;
use crate::point::Point;
use std::cmp::Reverse;

/// One offset-table bucket. Members are indices into the caller's location
/// slice; the slice itself is borrowed for the whole build.
#[derive(Debug)]
pub(crate) struct Bucket {
    /// Index of this bucket's entry in the offset table
    pub(crate) phi_index: u32,
    /// Member data, by input position
    pub(crate) members: Vec<u32>,
}

/// Partition `locations` by secondary hash and sort the buckets by
/// descending population. Ties are in no particular order.
pub(crate) fn partition<const D: usize>(locations: &[Point<D>], params: &Params) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = (0..params.r)
        .map(|phi_index| Bucket {
            phi_index,
            members: Vec::new(),
        })
        .collect();

    for (position, location) in locations.iter().enumerate() {
        buckets[params.bucket_index(location)]
            .members
            .push(position as u32);
    }

    buckets.sort_unstable_by_key(|b| Reverse(b.members.len()));
    buckets
}

#[cfg(test)]
mod test {
    use super::partition;
    use crate::params::Params;
    use crate::point::Point;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample_points(count: usize, side: u32, rng: &mut StdRng) -> Vec<Point<2>> {
        let mut points = Vec::new();
        while points.len() < count {
            let p = Point::new([rng.gen_range(0..side), rng.gen_range(0..side)]);
            if !points.contains(&p) {
                points.push(p);
            }
        }
        points
    }

    #[test]
    fn members_match_their_bucket() {
        let mut rng = StdRng::seed_from_u64(21);
        let locations = sample_points(200, 64, &mut rng);
        let mut params = Params::choose(locations.len() as u32, 2, &mut rng);
        params.grow(2);

        let buckets = partition(&locations, &params);
        assert_eq!(buckets.len(), params.r as usize);

        let mut seen = 0;
        for bucket in &buckets {
            for &member in &bucket.members {
                let location = &locations[member as usize];
                assert_eq!(params.bucket_index(location), bucket.phi_index as usize);
                seen += 1;
            }
        }
        assert_eq!(seen, locations.len());
    }

    #[test]
    fn sorted_by_descending_population() {
        let mut rng = StdRng::seed_from_u64(22);
        let locations = sample_points(150, 32, &mut rng);
        let mut params = Params::choose(locations.len() as u32, 2, &mut rng);
        params.grow(2);

        let buckets = partition(&locations, &params);
        for pair in buckets.windows(2) {
            assert!(pair[0].members.len() >= pair[1].members.len());
        }
    }
}
