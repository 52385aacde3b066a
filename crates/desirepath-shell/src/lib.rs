// Shell command segmentation and targeted rewrites.
// Splits on unquoted `;` `|` `&&` `||`, treats quoted regions as opaque,
// and edits segments in place so corrections splice back byte-exactly.

mod rewrite;
mod segment;

pub use rewrite::{apply_to_full, correct_flag, replace_command, replace_literal};
pub use segment::{Segment, parse_command};
