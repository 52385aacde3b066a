/// One command of a compound shell line: the command token, its remaining
/// tokens, the raw slice, and the byte offsets of that slice in the
/// original string. Offsets always refer to the original input so a
/// corrected segment can be spliced back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub command: String,
    pub args: Vec<String>,
    pub raw: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split a shell-style command string into segments.
///
/// Unquoted `;`, `|`, `&&` and `||` are boundaries. Single- and
/// double-quoted regions are opaque (no operator recognition inside);
/// backslash escapes the next character outside single quotes.
pub fn parse_command(input: &str) -> Vec<Segment> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut seg_start = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];

        if in_single {
            if c == b'\'' {
                in_single = false;
            }
            i += 1;
            continue;
        }
        if c == b'\\' {
            i += 2;
            continue;
        }
        if in_double {
            if c == b'"' {
                in_double = false;
            }
            i += 1;
            continue;
        }

        match c {
            b'\'' => {
                in_single = true;
                i += 1;
            }
            b'"' => {
                in_double = true;
                i += 1;
            }
            b';' => {
                push_segment(input, seg_start, i, &mut segments);
                i += 1;
                seg_start = i;
            }
            b'|' => {
                let op_len = if bytes.get(i + 1) == Some(&b'|') { 2 } else { 1 };
                push_segment(input, seg_start, i, &mut segments);
                i += op_len;
                seg_start = i;
            }
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                push_segment(input, seg_start, i, &mut segments);
                i += 2;
                seg_start = i;
            }
            _ => i += 1,
        }
    }

    push_segment(input, seg_start, input.len(), &mut segments);
    segments
}

fn push_segment(input: &str, start: usize, end: usize, out: &mut Vec<Segment>) {
    let end = end.min(input.len());
    if start >= end {
        return;
    }

    let slice = &input[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }

    let lead = slice.len() - slice.trim_start().len();
    let seg_start = start + lead;
    let seg_end = seg_start + trimmed.len();

    let tokens = tokenize(trimmed);
    let Some(first) = tokens.first() else {
        return;
    };

    out.push(Segment {
        command: first.text.clone(),
        args: tokens[1..].iter().map(|t| t.text.clone()).collect(),
        raw: trimmed.to_string(),
        start: seg_start,
        end: seg_end,
    });
}

/// Split a segment's raw text on unescaped whitespace, quotes preserved
/// verbatim in the token text. Offsets are relative to the raw slice.
pub(crate) fn tokenize(raw: &str) -> Vec<Token> {
    let bytes = raw.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        while i < bytes.len() && is_blank(bytes[i]) {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let start = i;
        let mut in_single = false;
        let mut in_double = false;
        while i < bytes.len() {
            let c = bytes[i];
            if in_single {
                if c == b'\'' {
                    in_single = false;
                }
                i += 1;
                continue;
            }
            if c == b'\\' {
                i += 2;
                continue;
            }
            if in_double {
                if c == b'"' {
                    in_double = false;
                }
                i += 1;
                continue;
            }
            match c {
                b'\'' => {
                    in_single = true;
                    i += 1;
                }
                b'"' => {
                    in_double = true;
                    i += 1;
                }
                _ if is_blank(c) => break,
                _ => i += 1,
            }
        }

        let end = i.min(bytes.len());
        tokens.push(Token {
            text: raw[start..end].to_string(),
            start,
            end,
        });
    }

    tokens
}

fn is_blank(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment() {
        let segments = parse_command("ls -la /tmp");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].command, "ls");
        assert_eq!(segments[0].args, vec!["-la", "/tmp"]);
        assert_eq!(segments[0].raw, "ls -la /tmp");
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].end, 11);
    }

    #[test]
    fn test_chain_operators_split() {
        let segments = parse_command("cd /tmp && scp -rP 22 f host:/");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].command, "cd");
        assert_eq!(segments[1].command, "scp");
        assert_eq!(segments[1].raw, "scp -rP 22 f host:/");
    }

    #[test]
    fn test_all_operator_kinds() {
        let segments = parse_command("a; b | c && d || e");
        let commands: Vec<&str> = segments.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_operators_inside_quotes_are_opaque() {
        let segments = parse_command(r#"echo "a && b; c" | grep 'x || y'"#);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].command, "echo");
        assert_eq!(segments[0].args, vec![r#""a && b; c""#]);
        assert_eq!(segments[1].command, "grep");
        assert_eq!(segments[1].args, vec!["'x || y'"]);
    }

    #[test]
    fn test_backslash_escapes_operator() {
        let segments = parse_command(r"echo a \&\& b");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].args, vec!["a", r"\&\&", "b"]);
    }

    #[test]
    fn test_escaped_whitespace_stays_in_token() {
        let segments = parse_command(r"cat my\ file.txt");
        assert_eq!(segments[0].args, vec![r"my\ file.txt"]);
    }

    #[test]
    fn test_offsets_point_into_original() {
        let input = "cd /tmp && ls";
        let segments = parse_command(input);
        assert_eq!(&input[segments[0].start..segments[0].end], "cd /tmp");
        assert_eq!(&input[segments[1].start..segments[1].end], "ls");
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let segments = parse_command("a ;; ; b");
        let commands: Vec<&str> = segments.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_command("").is_empty());
        assert!(parse_command("   ").is_empty());
    }
}
