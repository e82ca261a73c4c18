//! Resolution, validation and search engine.
//!
//! The engine turns parsed rules into occurrences. It is split into focused
//! submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! ```text
//! rules ── validate (validate.rs) ── Expression
//!                                        │
//! base (UTC) ── to_local (zone.rs) ──────┤
//!                                        v
//!                              Plan::new (search.rs)
//!                                - one Matcher per rule (matcher.rs)
//!                                - pins for unconstrained units
//!                                        │
//!                              Plan::next
//!                                - ask every unmatched rule for a hint
//!                                - jump to the earliest landing
//!                                - stop when all rules match
//!                                        │
//!                              to_utc (zone.rs) ── occurrence (UTC)
//! ```
//!
//! Every matcher reads constraint values through the [`Resolver`]
//! (`resolve.rs`), which caches them in a [`ResolverCache`] (`cache.rs`).
//! Values such as `Last` or `3rdFriday` depend on the month being probed, so
//! they are resolved lazily per candidate, never up front.
//!
//! ## Responsibilities by module
//!
//! - `cache.rs`: the cache trait plus the sweeping and pass-through caches.
//! - `resolve.rs`: constraint text to calendar values.
//! - `validate.rs`: ordered rule-set checks run after parsing.
//! - `matcher.rs`: per-rule match tests and advance hints.
//! - `search.rs`: the search plan and the jump loop.
//! - `zone.rs`: UTC/local conversion at the search boundaries.
//! - `metrics.rs`: optional timing and candidate traces.
//!
//! ## Debugging
//!
//! The engine emits `tracing` events: `debug` for validation outcomes and
//! zone retries, `trace` for every search jump and cache sweep, `warn` when a
//! search hits its iteration ceiling.

#[path = "engine/cache.rs"]
mod cache;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/search.rs"]
mod search;
#[path = "engine/validate.rs"]
mod validate;
#[path = "engine/zone.rs"]
pub(crate) mod zone;

pub use cache::{CacheConfig, CacheKey, NoCache, ResolverCache, SweepingCache, global_cache};
pub use metrics::{SearchMetrics, SearchTrace, TRACE_LIMIT};
pub use resolve::{Resolution, Resolver, resolve};
pub(crate) use validate::validate;
