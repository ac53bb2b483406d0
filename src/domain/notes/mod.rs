// ============================================================================
// Notes Domain - research notes keyed by URL
// ============================================================================

pub mod encoded_url;
pub mod note;
pub mod queries;

pub use encoded_url::encode_url;
pub use note::Note;
pub use queries::find_by_encoded_url;
