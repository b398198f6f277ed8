#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(noop_method_call)]
#![warn(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

mod bucket;
mod err;
mod params;
mod point;
mod solver;
mod witness;

pub use err::Error;
pub use point::Point;

use crate::params::Params;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_core::RngCore;
use std::mem;
use tracing::debug;

/// Default worker-thread count for the offset search.
const DEFAULT_WORKERS: usize = 8;

/// One input pair: a lattice location and the payload stored there.
///
/// Locations must be unique and componentwise inside the domain cube.
#[derive(Debug, Clone)]
pub struct Datum<const D: usize, T> {
    /// Lattice location of this payload
    pub location: Point<D>,
    /// Payload; moved into the value table when construction succeeds
    pub contents: T,
}

/// One slot of the value table: a witness pair and, in occupied slots, the
/// resident payload. The resident's coordinates are not stored; the
/// witness pair is the only evidence a query checks.
#[derive(Debug, Clone)]
struct Slot<T> {
    /// Witness discriminator, always ≥ 1
    k: u32,
    /// Witness hash of the resident's location at `k`
    hk: u32,
    /// Resident payload, `None` in unoccupied slots
    contents: Option<T>,
}

/// A perfect spatial hash map over a sparse set of lattice points.
///
/// Built once by [`Map::build`] or a [`MapBuilder`], then immutable:
/// queries take `&self`, are pure, and may run from any number of threads
/// without synchronization. Storage is two flat tables, an offset table of
/// roughly `n/d` points and a value table of roughly `n` slots, plus a
/// handful of scalars.
#[derive(Debug)]
pub struct Map<const D: usize, T> {
    /// Table shapes and hash multipliers, frozen at build time
    params: Params,
    /// Offset table Φ, indexed by the secondary hash
    phi: Vec<Point<D>>,
    /// Value table H, indexed by the offset-adjusted primary hash
    slots: Vec<Slot<T>>,
    /// Number of stored entries
    len: usize,
}

impl<const D: usize, T> Map<D, T> {
    /// Build a map with default options.
    ///
    /// Equivalent to [`MapBuilder::new().build(…)`](MapBuilder::build).
    pub fn build(data: Vec<Datum<D, T>>, domain_size: Point<D>) -> Result<Self, Error> {
        MapBuilder::new().build(data, domain_size)
    }

    /// Look up the payload stored at `p`.
    ///
    /// Constant work: one primary hash, one offset lookup, one witness
    /// comparison. Returns `None` for any lattice point of the domain that
    /// was not in the input.
    pub fn get(&self, p: Point<D>) -> Option<&T> {
        let slot = &self.slots[self.params.slot_index(&p, &self.phi)];
        if slot.hk == witness::witness_hash(&p, self.params.m2, slot.k) {
            slot.contents.as_ref()
        } else {
            None
        }
    }

    /// Number of entries stored in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map stores no entries. Always false today: a build
    /// refuses empty input.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// In-memory footprint in bytes: both tables plus the fixed scalars.
    /// Useful for comparing compactness across builds.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>()
            + mem::size_of::<Point<D>>() * self.phi.capacity()
            + mem::size_of::<Slot<T>>() * self.slots.capacity()
    }
}

/// Builder for [`Map`] instances with custom settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MapBuilder {
    /// Fixed RNG seed, or `None` for per-build entropy
    seed: Option<u64>,
    /// Worker-thread count for the offset search
    workers: usize,
}

impl MapBuilder {
    /// Create a new [`MapBuilder`] with default settings.
    ///
    /// Immediately calling [`Self::build()`] is equivalent to using
    /// [`Map::build()`].
    pub fn new() -> Self {
        Self {
            seed: None,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Seed the construction RNG.
    ///
    /// Construction draws its hash multipliers and search start offsets
    /// from one generator, seeded from entropy by default. Fixing the seed
    /// makes parameter choice reproducible for tests; note that the
    /// parallel offset race keeps the table contents themselves
    /// unspecified even under a fixed seed.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Set the worker-thread count for the offset search. Clamped to at
    /// least one.
    pub fn workers(&mut self, workers: usize) -> &mut Self {
        self.workers = workers.max(1);
        self
    }

    /// Build a [`Map`] from `data` over the cubic domain `[0, domain_size)`.
    ///
    /// Construction retries with a larger offset table until it succeeds,
    /// so the only failures surfaced here are input-validation errors. The
    /// witness stage enumerates every point of the domain cube; treat the
    /// domain extent as a cost parameter, not just a bound.
    pub fn build<const D: usize, T>(
        &self,
        data: Vec<Datum<D, T>>,
        domain_size: Point<D>,
    ) -> Result<Map<D, T>, Error> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.build_with_rng(&mut rng, data, domain_size)
    }

    /// Build a [`Map`] drawing all randomness from the supplied generator.
    pub fn build_with_rng<const D: usize, T, R: RngCore>(
        &self,
        rng: &mut R,
        data: Vec<Datum<D, T>>,
        domain_size: Point<D>,
    ) -> Result<Map<D, T>, Error> {
        validate(&data, &domain_size)?;
        let n = data.len();

        // Locations stay borrowed through every attempt; payloads move
        // exactly once, into the winning value table.
        let mut locations = Vec::with_capacity(n);
        let mut payloads: Vec<Option<T>> = Vec::with_capacity(n);
        for datum in data {
            locations.push(datum.location);
            payloads.push(Some(datum.contents));
        }

        // Universe indices of the input, ascending: the witness sweep
        // consumes these to skip occupied points, and adjacent duplicates
        // expose repeated locations before any table work happens.
        let mut sorted_indices: Vec<u32> = locations
            .iter()
            .map(|l| l.to_index(domain_size[0], u32::MAX))
            .collect();
        sorted_indices.sort_unstable();
        if sorted_indices.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(Error::DuplicateLocation);
        }

        let mut params = Params::choose(n as u32, D as u32, rng);
        let mut attempt = 0_u32;
        let (phi, residents) = loop {
            attempt += 1;
            params.grow(D as u32);
            if params.bad_ratio() {
                debug!(r_bar = params.r_bar, "pathological table ratio, growing again");
                continue;
            }

            let buckets = bucket::partition(&locations, &params);
            let failure = match solver::place_buckets(
                &locations,
                &buckets,
                &params,
                self.workers,
                rng,
            ) {
                Ok((phi, mut residents)) => {
                    match witness::assign(
                        &mut residents,
                        &phi,
                        &sorted_indices,
                        &domain_size,
                        &params,
                    ) {
                        Ok(()) => break (phi, residents),
                        Err(failure) => failure,
                    }
                }
                Err(failure) => failure,
            };
            debug!(
                attempt,
                ?failure,
                r_bar = params.r_bar,
                "attempt failed, growing the offset table"
            );
        };
        debug!(attempt, m = params.m, r = params.r, "construction finished");

        let slots = residents
            .into_iter()
            .map(|resident| match resident {
                Some(resident) => Slot {
                    k: resident.k,
                    hk: resident.hk,
                    contents: Some(
                        payloads[resident.datum as usize]
                            .take()
                            .expect("every datum is placed exactly once"),
                    ),
                },
                None => Slot {
                    k: 1,
                    hk: 1,
                    contents: None,
                },
            })
            .collect();

        Ok(Map {
            params,
            phi,
            slots,
            len: n,
        })
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a map with default options. Mirrors [`Map::build`] for callers who
/// prefer a free function.
pub fn build<const D: usize, T>(
    data: Vec<Datum<D, T>>,
    domain_size: Point<D>,
) -> Result<Map<D, T>, Error> {
    MapBuilder::new().build(data, domain_size)
}

/// Check the build preconditions that are cheap to state and costly to
/// leave undefined.
fn validate<const D: usize, T>(data: &[Datum<D, T>], domain_size: &Point<D>) -> Result<(), Error> {
    if D == 0 {
        return Err(Error::ZeroDimension);
    }
    if data.is_empty() {
        return Err(Error::Empty);
    }
    let side = domain_size[0];
    if side == 0 {
        return Err(Error::EmptyDomain);
    }
    if (0..D).any(|axis| domain_size[axis] != side) {
        return Err(Error::NonCubicDomain);
    }
    if data
        .iter()
        .any(|datum| (0..D).any(|axis| datum.location[axis] >= side))
    {
        return Err(Error::OutOfDomain);
    }
    Ok(())
}
