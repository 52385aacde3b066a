/// Default minimum score for a name to count as a suggestion.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A ranked candidate from the known-name set.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub score: f64,
}

/// Canonicalize a tool name: split on underscores, hyphens and camel-case
/// boundaries (an uppercase run splits before its final uppercase when a
/// lowercase follows, so `XMLParser` becomes `XML Parser`), lowercase,
/// join with single spaces.
pub fn canonicalize_name(name: &str) -> String {
    split_words(name).join(" ")
}

fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for i in 0..chars.len() {
        let c = chars[i];
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Similarity in [0, 1]. A case-insensitive exact match (after
/// canonicalization) scores exactly 1.0 before any edit distance runs.
/// Otherwise the score is `1 − lev/max` over the space-stripped compact
/// forms, plus a 0.1-weighted shared-prefix bonus and a 0.05-weighted
/// shared-suffix bonus, clamped to [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let ca = canonicalize_name(a);
    let cb = canonicalize_name(b);
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }
    if ca == cb {
        return 1.0;
    }

    let xa: Vec<char> = ca.chars().filter(|c| *c != ' ').collect();
    let xb: Vec<char> = cb.chars().filter(|c| *c != ' ').collect();
    let max = xa.len().max(xb.len()) as f64;
    if max == 0.0 {
        return 0.0;
    }

    let base = 1.0 - edit_distance(&xa, &xb) as f64 / max;
    let prefix = shared_prefix(&xa, &xb) as f64;
    let suffix = shared_suffix(&xa, &xb) as f64;
    let score = base + 0.1 * prefix / max + 0.05 * suffix / max;
    score.clamp(0.0, 1.0)
}

/// Rank the known names against a query, keeping up to `limit` results at
/// or above `threshold`, sorted by score descending. Empty input yields
/// an empty result rather than a failure.
pub fn suggest(query: &str, known: &[String], limit: usize, threshold: f64) -> Vec<Suggestion> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let mut suggestions: Vec<Suggestion> = known
        .iter()
        .map(|name| Suggestion {
            name: name.clone(),
            score: similarity(query, name),
        })
        .filter(|s| s.score >= threshold)
        .collect();

    suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    suggestions.truncate(limit);
    suggestions
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn shared_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn shared_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_separators_and_camel() {
        assert_eq!(canonicalize_name("read_file"), "read file");
        assert_eq!(canonicalize_name("read-file"), "read file");
        assert_eq!(canonicalize_name("readFile"), "read file");
        assert_eq!(canonicalize_name("ReadFile"), "read file");
        assert_eq!(canonicalize_name("XMLParser"), "xml parser");
        assert_eq!(canonicalize_name("HTTPServer"), "http server");
        assert_eq!(canonicalize_name("Read"), "read");
    }

    #[test]
    fn test_identity_scores_one() {
        for name in ["Read", "read_file", "XMLParser"] {
            assert_eq!(similarity(name, name), 1.0);
        }
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        assert_eq!(similarity("read", "Read"), 1.0);
        assert_eq!(similarity("read_file", "ReadFile"), 1.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let pairs = [
            ("read_file", "Read"),
            ("grep", "Glob"),
            ("WriteFile", "write"),
            ("x", "completely_different_name"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            let ba = similarity(b, a);
            assert_eq!(ab, ba, "similarity must be symmetric for {a}/{b}");
            assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_read_file_suggests_read() {
        let known: Vec<String> = ["Read", "Write", "Edit", "Bash", "Glob", "Grep"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let suggestions = suggest("read_file", &known, 3, 0.1);
        assert!(!suggestions.is_empty());
        let read = suggestions
            .iter()
            .find(|s| s.name == "Read")
            .expect("Read should be suggested");
        assert!(read.score > 0.5, "score was {}", read.score);
        assert_eq!(suggestions[0].name, "Read");
    }

    #[test]
    fn test_threshold_filters() {
        let known = vec!["Zebra".to_string()];
        assert!(suggest("read_file", &known, 5, DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let known = vec!["Read".to_string()];
        assert!(suggest("", &known, 5, 0.0).is_empty());
        assert!(suggest("   ", &known, 5, 0.0).is_empty());
    }

    #[test]
    fn test_edit_distance_basics() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(edit_distance(&a, &b), 3);
        assert_eq!(edit_distance(&a, &a), 0);
        assert_eq!(edit_distance(&a, &[]), 6);
    }
}
