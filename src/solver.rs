//! Parallel search for collision-free offset-table entries.
//!
//! Buckets are solved strictly one at a time, largest first. Within one
//! bucket the candidate offsets are scanned by a fixed pool of scoped
//! worker threads over disjoint chunks of `[0, m)`; the first worker to
//! find a candidate that places every member on a free, distinct slot
//! publishes it under a mutex and the rest wind down. Stopping is
//! best-effort: a stale flag read only costs a few extra candidate
//! evaluations, never correctness. There is no determinism contract inside
//! one bucket's search: the random start offset and the publication race
//! both break it.

use crate::bucket::Bucket;
use crate::err::Failure;
use crate::params::Params;
use crate::point::Point;
use crate::witness::witness_hash;
use parking_lot::Mutex;
use rand::Rng;
use rand_core::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::trace;

/// A placed input point: everything construction needs to know about one
/// occupied value-table slot before the payloads move in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resident<const D: usize> {
    /// Lattice location of the resident
    pub(crate) location: Point<D>,
    /// Position of the source datum in the caller's input order
    pub(crate) datum: u32,
    /// Witness discriminator, always ≥ 1
    pub(crate) k: u32,
    /// Witness hash of `location` at `k`
    pub(crate) hk: u32,
}

/// Solve every non-empty bucket, committing each offset before the next
/// bucket's search begins. Later buckets' collision probes depend on the
/// slots already occupied by earlier ones, so this ordering is required
/// for correctness, not just convenience.
///
/// Returns the finished offset table and the occupancy of the value table,
/// or fails the whole attempt if any bucket exhausts its candidate range.
pub(crate) fn place_buckets<const D: usize, R: RngCore>(
    locations: &[Point<D>],
    buckets: &[Bucket],
    params: &Params,
    workers: usize,
    rng: &mut R,
) -> Result<(Vec<Point<D>>, Vec<Option<Resident<D>>>), Failure> {
    let mut phi = vec![Point::zero(); params.r as usize];
    let mut residents: Vec<Option<Resident<D>>> = vec![None; params.m as usize];

    for bucket in buckets {
        // Descending sort: the first empty bucket ends the work.
        if bucket.members.is_empty() {
            break;
        }

        // The candidate offset is added to the primary hash of every
        // member, so those hashes are computed once per bucket.
        let primary: Vec<Point<D>> = bucket
            .members
            .iter()
            .map(|&member| params.m0 * locations[member as usize])
            .collect();

        let start = rng.gen_range(0..params.m);
        let offset = jiggle_offsets(&primary, &residents, params, start, workers)
            .ok_or(Failure::OffsetsExhausted)?;

        phi[bucket.phi_index as usize] = offset;
        for (&member, h0) in bucket.members.iter().zip(&primary) {
            let slot = (*h0 + offset).to_index(params.m_bar, params.m) as usize;
            let location = locations[member as usize];
            residents[slot] = Some(Resident {
                location,
                datum: member,
                k: 1,
                hk: witness_hash(&location, params.m2, 1),
            });
        }
        trace!(
            phi_index = bucket.phi_index,
            size = bucket.members.len(),
            "placed bucket"
        );
    }

    Ok((phi, residents))
}

/// Scan all `m` candidate offsets for one bucket, in parallel chunks.
///
/// A candidate succeeds when every member lands on an unoccupied slot and
/// no two members land on the same one. The winner is whichever success
/// reaches the publication lock first, not the lowest candidate index.
fn jiggle_offsets<const D: usize>(
    primary: &[Point<D>],
    residents: &[Option<Resident<D>>],
    params: &Params,
    start: u32,
    workers: usize,
) -> Option<Point<D>> {
    let found = AtomicBool::new(false);
    let winner: Mutex<Option<Point<D>>> = Mutex::new(None);
    let chunk = params.m as usize / workers + 1;

    thread::scope(|s| {
        for worker in 0..workers {
            let lo = worker * chunk;
            let hi = (lo + chunk).min(params.m as usize);
            if lo >= hi {
                break;
            }
            let found = &found;
            let winner = &winner;
            s.spawn(move || {
                let mut slots: Vec<usize> = Vec::with_capacity(primary.len());
                for i in lo..hi {
                    if found.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = ((u64::from(start) + i as u64) % u64::from(params.m)) as u32;
                    let candidate = Point::from_index(index, params.m_bar);

                    slots.clear();
                    let mut collision = false;
                    for h0 in primary {
                        let slot = (*h0 + candidate).to_index(params.m_bar, params.m) as usize;
                        if residents[slot].is_some() || slots.contains(&slot) {
                            collision = true;
                            break;
                        }
                        slots.push(slot);
                    }

                    if !collision {
                        let mut guard = winner.lock();
                        if guard.is_none() {
                            *guard = Some(candidate);
                            // The mutex orders the offset itself; the flag
                            // is only an early-stop hint.
                            found.store(true, Ordering::Relaxed);
                        }
                        break;
                    }
                }
            });
        }
    });

    winner.into_inner()
}
