// Analysis over recorded tool calls: name similarity, failure
// categorization, and promotion of recurring turn patterns to desires.

mod categorize;
mod similarity;
mod surface;

pub use categorize::{categorize, extract_command};
pub use similarity::{
    DEFAULT_THRESHOLD, Suggestion, canonicalize_name, similarity, suggest,
};
pub use surface::{SESSION_THRESHOLD, surface_turn_patterns};
