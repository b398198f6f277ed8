//! Error types for the `pshx` crate

/// Errors raised while validating input to a build.
///
/// Everything that can go wrong *during* construction (a pathological
/// table ratio, an exhausted offset scan, a saturated witness rehash) is
/// absorbed by the internal retry loop and never surfaces here. A query on
/// a point that was never inserted is not an error either; it reports as
/// `None`.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input point set is empty.
    #[error("cannot build a map from an empty point set")]
    Empty,

    /// The lattice dimension is zero.
    #[error("lattice dimension must be at least 1")]
    ZeroDimension,

    /// The domain extents differ between axes. The witness sweep enumerates
    /// the domain as a cube and requires every axis to have equal extent.
    #[error("domain must be a cube with equal extent on every axis")]
    NonCubicDomain,

    /// The domain has zero extent.
    #[error("domain extent must be nonzero")]
    EmptyDomain,

    /// Some input location has a coordinate outside `[0, domain_size)`.
    #[error("input location lies outside the domain")]
    OutOfDomain,

    /// Two input data share a location.
    #[error("input locations must be unique")]
    DuplicateLocation,
}

/// Reasons a single construction attempt can fail.
///
/// Each failure feeds the same recovery: grow the offset table side length
/// and rebuild from the bucketing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Some bucket scanned every candidate offset without finding a
    /// collision-free placement.
    OffsetsExhausted,

    /// A contested slot ran its discriminator up to the cap without
    /// becoming distinguishable from every colliding non-member.
    WitnessSaturated,
}
