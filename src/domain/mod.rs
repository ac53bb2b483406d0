// ============================================================================
// Domain Layer - Record Types
// ============================================================================
//
// Each record type has its own subdirectory with its key derivation, the
// `Record` implementation and any lookups specific to it. Generic CRUD lives
// in src/record_store/.
//
// ============================================================================

pub mod notes;
