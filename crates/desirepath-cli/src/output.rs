use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Plain aligned columns; headers are bold on a terminal and plain when
/// piped.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let tty = std::io::stdout().is_terminal();
    let header_line = render_row(
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        &widths,
    );
    if tty {
        println!("{}", header_line.bold());
    } else {
        println!("{}", header_line);
    }

    for row in rows {
        println!("{}", render_row(row, &widths));
    }
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        if i + 1 < cells.len() {
            let pad = widths[i].saturating_sub(cell.chars().count());
            line.extend(std::iter::repeat_n(' ', pad));
        }
    }
    line
}

/// Single-line preview for wide cells (error text, JSON payloads).
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let truncated: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb\tc", 10), "a b c");
        let long = "x".repeat(20);
        let shortened = preview(&long, 10);
        assert_eq!(shortened.chars().count(), 10);
        assert!(shortened.ends_with('…'));
    }

    #[test]
    fn test_render_row_alignment() {
        let widths = vec![5, 3];
        let row = vec!["ab".to_string(), "c".to_string()];
        assert_eq!(render_row(&row, &widths), "ab     c");
    }
}
