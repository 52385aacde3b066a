// Parser for line-delimited assistant session transcripts.
// Reconstructs turns and tool steps with parallelism and error flags.

mod error;
mod parser;
mod schema;

pub use error::{Error, Result};
pub use parser::{
    SessionTranscript, ToolStep, TranscriptTurn, parse_transcript, parse_transcript_file,
};
