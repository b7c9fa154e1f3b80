// Contradiction metrics per meeting and across meetings
// Summaries are views over violation records, never a source of truth

pub mod aggregation;
pub mod types;

pub use aggregation::{rate, summarize, summarize_batch};
pub use types::*;
