//! Post-placement location witnesses.
//!
//! After every bucket lands, each occupied slot holds its payload and a
//! witness pair `(k, hk)` with `hk = H2(location, k)`. A query compares the
//! stored `hk` against `H2(q, k)` for the queried point, so lookups can
//! reject non-members without the table storing any coordinates. That only
//! works if, for every unoccupied domain point that hashes into an occupied
//! slot, the witness hash differs from the resident's. This module selects
//! the per-slot discriminator `k` that makes it so, in three sweeps over
//! the whole domain cube:
//!
//! 1. find the slots where some unoccupied point ties the resident at the
//!    initial `k = 1`,
//! 2. gather every domain point landing in those contested slots,
//! 3. bump each contested slot's `k` until its resident hashes unlike all
//!    of its contenders.
//!
//! Sweeps 1 and 2 walk all `s^d` points of the cube; the domain extent, not
//! the input size, dominates this phase.

use crate::err::Failure;
use crate::params::Params;
use crate::point::Point;
use crate::solver::Resident;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Hard cap on the discriminator. Termination of the rehash loop is
/// probabilistic; a slot that cannot be discriminated within the cap fails
/// the attempt so the retry loop can reshape the tables instead of spinning.
const MAX_K: u32 = 32;

/// Witness hash `H2(p, k)`: the wrapping dot of `p` with `(k, k², …, k^D)`,
/// multiplied by the witness prime. `k = 0` would collapse this to a
/// constant, so discriminators start at 1.
#[inline(always)]
pub(crate) fn witness_hash<const D: usize>(p: &Point<D>, m2: u32, k: u32) -> u32 {
    p.dot(&Point::increasing_pow(k)).wrapping_mul(m2)
}

/// Number of lattice points in the cubic domain: the flattened far corner,
/// reduced by the `u32::MAX` sentinel, plus one. All axes share the extent
/// of axis zero.
pub(crate) fn universe_len<const D: usize>(domain_size: &Point<D>) -> u32 {
    let corner = Point::new(domain_size.coords().map(|c| c - 1));
    corner.to_index(domain_size[0], u32::MAX).wrapping_add(1)
}

/// Assign a discriminator to every slot that some non-member can reach.
///
/// `sorted_indices` holds the universe index of every input location in
/// ascending order; sweep 1 advances through it to skip occupied points.
pub(crate) fn assign<const D: usize>(
    residents: &mut [Option<Resident<D>>],
    phi: &[Point<D>],
    sorted_indices: &[u32],
    domain_size: &Point<D>,
    params: &Params,
) -> Result<(), Failure> {
    let side = domain_size[0];
    let universe = universe_len(domain_size);

    // Sweep 1: mark slots whose resident is indistinguishable, at the
    // initial discriminator, from some unoccupied point of the domain.
    let mut contested = vec![false; residents.len()];
    let mut next = 0_usize;
    for i in 0..universe {
        if next < sorted_indices.len() && sorted_indices[next] == i {
            next += 1;
            continue;
        }
        let p = Point::from_index(i, side);
        let slot = params.slot_index(&p, phi);
        if let Some(resident) = &residents[slot] {
            if resident.hk == witness_hash(&p, params.m2, 1) {
                contested[slot] = true;
            }
        }
    }

    // Sweep 2: collect every domain point that lands in a contested slot,
    // residents included; sweep 3 skips them by location.
    let mut collisions: HashMap<usize, Vec<u32>> = HashMap::new();
    for i in 0..universe {
        let p = Point::from_index(i, side);
        let slot = params.slot_index(&p, phi);
        if contested[slot] {
            collisions.entry(slot).or_default().push(i);
        }
    }

    // Sweep 3: rehash each contested slot until its resident is unique
    // among its contenders.
    for (&slot, contenders) in &collisions {
        let resident = residents[slot]
            .as_mut()
            .expect("contested slot always has a resident");
        'rehash: loop {
            if resident.k == MAX_K {
                debug!(slot, "witness discriminator saturated");
                return Err(Failure::WitnessSaturated);
            }
            resident.k += 1;
            resident.hk = witness_hash(&resident.location, params.m2, resident.k);
            for &i in contenders {
                let p = Point::from_index(i, side);
                if p != resident.location
                    && witness_hash(&p, params.m2, resident.k) == resident.hk
                {
                    continue 'rehash;
                }
            }
            break;
        }
    }

    trace!(contested = collisions.len(), "assigned location witnesses");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{assign, universe_len, witness_hash};
    use crate::bucket::partition;
    use crate::params::Params;
    use crate::point::Point;
    use crate::solver::place_buckets;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn universe_of_a_cube() {
        assert_eq!(universe_len(&Point::new([32, 32])), 1024);
        assert_eq!(universe_len(&Point::new([16, 16, 16])), 4096);
        assert_eq!(universe_len(&Point::new([1024])), 1024);
    }

    #[test]
    fn hash_depends_on_discriminator() {
        let p = Point::new([5, 7]);
        // Not a proof, but k must actually enter the mix.
        assert_ne!(witness_hash(&p, 53, 1), witness_hash(&p, 53, 2));
    }

    /// After assignment, no unoccupied domain point shares both slot and
    /// witness hash with a resident.
    #[test]
    fn residents_distinguish_all_contenders() {
        let mut rng = StdRng::seed_from_u64(11);
        let domain = Point::new([24, 24]);
        let mut locations: Vec<Point<2>> = Vec::new();
        while locations.len() < 30 {
            let p = Point::new([rng.gen_range(0..24), rng.gen_range(0..24)]);
            if !locations.contains(&p) {
                locations.push(p);
            }
        }

        let mut sorted_indices: Vec<u32> = locations
            .iter()
            .map(|l| l.to_index(domain[0], u32::MAX))
            .collect();
        sorted_indices.sort_unstable();

        let mut params = Params::choose(locations.len() as u32, 2, &mut rng);
        loop {
            params.grow(2);
            if params.bad_ratio() {
                continue;
            }
            let buckets = partition(&locations, &params);
            let Ok((phi, mut residents)) =
                place_buckets(&locations, &buckets, &params, 4, &mut rng)
            else {
                continue;
            };
            if assign(&mut residents, &phi, &sorted_indices, &domain, &params).is_err() {
                continue;
            }

            for i in 0..universe_len(&domain) {
                let p = Point::from_index(i, domain[0]);
                if locations.contains(&p) {
                    continue;
                }
                let slot = params.slot_index(&p, &phi);
                if let Some(resident) = &residents[slot] {
                    assert_ne!(
                        resident.hk,
                        witness_hash(&p, params.m2, resident.k),
                        "non-member {p:?} indistinguishable from resident at slot {slot}"
                    );
                }
            }
            break;
        }
    }
}
