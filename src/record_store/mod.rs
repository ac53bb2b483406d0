// ============================================================================
// Record Store - Generic Data-Access Layer
// ============================================================================
//
// Translates typed records into document store calls, enforces identity and
// existence rules, aggregates per-record failures for batch writes and
// classifies every failure into a small taxonomy (see errors.rs).
//
// Works with ANY type implementing `Record`. Domain types live in src/domain/.
//
// ============================================================================

mod context;
mod errors;
mod record;
mod store;

pub use context::OpContext;
pub use errors::{ErrorKind, RecordError, RecordFailure};
pub use record::{Record, Timestamps};
pub use store::RecordStore;
