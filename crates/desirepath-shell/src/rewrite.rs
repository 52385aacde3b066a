use crate::segment::{Segment, tokenize};

/// Replace the first occurrence of a flag in a segment.
///
/// A multi-character `old_flag` is treated as a long flag: the token
/// `--<old>` or the `--<old>=` prefix of a valued token is replaced. A
/// single-character flag is corrected inside the first short-option
/// cluster (a token starting with `-` but not `--`), preserving the
/// surrounding characters: `-xzf` with `z → j` becomes `-xjf`.
///
/// Returns `None` when the flag does not occur.
pub fn correct_flag(segment: &Segment, old_flag: &str, new_flag: &str) -> Option<Segment> {
    let tokens = tokenize(&segment.raw);

    if old_flag.len() > 1 {
        let long_old = format!("--{}", old_flag);
        let prefixed = format!("--{}=", old_flag);
        for token in &tokens {
            if token.text == long_old {
                let replacement = format!("--{}", new_flag);
                return Some(splice(segment, token.start, token.end, &replacement));
            }
            if let Some(value) = token.text.strip_prefix(&prefixed) {
                let replacement = format!("--{}={}", new_flag, value);
                return Some(splice(segment, token.start, token.end, &replacement));
            }
        }
        return None;
    }

    let old_char = old_flag.chars().next()?;
    let new_char = new_flag.chars().next()?;
    let cluster = tokens
        .iter()
        .find(|t| t.text.starts_with('-') && !t.text.starts_with("--"))?;

    let body_offset = cluster.text[1..].find(old_char)?;
    let char_pos = cluster.start + 1 + body_offset;
    Some(splice(
        segment,
        char_pos,
        char_pos + old_char.len_utf8(),
        &new_char.to_string(),
    ))
}

/// Substitute the command token (token 0) of a segment.
pub fn replace_command(segment: &Segment, new_command: &str) -> Segment {
    let tokens = tokenize(&segment.raw);
    match tokens.first() {
        Some(first) => splice(segment, first.start, first.end, new_command),
        None => segment.clone(),
    }
}

/// Substitute the first occurrence of a literal string in the segment's
/// raw text. Returns `None` when the literal does not occur.
pub fn replace_literal(segment: &Segment, old: &str, new: &str) -> Option<Segment> {
    let at = segment.raw.find(old)?;
    Some(splice(segment, at, at + old.len(), new))
}

/// Splice a (possibly corrected) segment back into the original command
/// string using the segment's stored byte offsets. Passing the segment's
/// own raw text reproduces the original unchanged.
pub fn apply_to_full(original: &str, segment: &Segment, new_raw: &str) -> String {
    let mut result = String::with_capacity(original.len() + new_raw.len());
    result.push_str(&original[..segment.start]);
    result.push_str(new_raw);
    result.push_str(&original[segment.end..]);
    result
}

/// Rebuild a segment around an edit of its raw text. The original
/// offsets are kept so `apply_to_full` still addresses the right span.
fn splice(segment: &Segment, from: usize, to: usize, replacement: &str) -> Segment {
    let mut raw = String::with_capacity(segment.raw.len() + replacement.len());
    raw.push_str(&segment.raw[..from]);
    raw.push_str(replacement);
    raw.push_str(&segment.raw[to..]);

    let tokens = tokenize(&raw);
    Segment {
        command: tokens.first().map(|t| t.text.clone()).unwrap_or_default(),
        args: tokens.iter().skip(1).map(|t| t.text.clone()).collect(),
        raw,
        start: segment.start,
        end: segment.end,
    }
}
