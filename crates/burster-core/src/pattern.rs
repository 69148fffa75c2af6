//! Hostname pattern expansion.
//!
//! A pattern is a comma-separated list of tokens. Each token may contain
//! bracket groups holding a range list, e.g. `cn[1-3,7]` or `gpu[1-2]-[5-6]`.
//! Commas inside brackets separate range items, not tokens.

/// Splits a pattern on top-level commas, keeping bracket groups intact.
///
/// Empty tokens are dropped. A pattern yielding no token at all returns a
/// single empty string.
pub fn split(pattern: &str) -> Vec<String> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => match closing_bracket(bytes, i) {
                Some(end) => i = end + 1,
                None => i += 1,
            },
            b',' => {
                if i > start {
                    tokens.push(pattern[start..i].to_string());
                }
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        tokens.push(pattern[start..].to_string());
    }

    if tokens.is_empty() {
        tokens.push(String::new());
    }
    tokens
}

/// Index of the `]` closing the group opened at `open`, if the group holds no
/// other bracket.
fn closing_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    for (offset, b) in bytes[open + 1..].iter().enumerate() {
        match b {
            b']' => return Some(open + 1 + offset),
            b'[' => return None,
            _ => {}
        }
    }
    None
}

/// Expands every bracket group of a single token.
///
/// The innermost-first group (the last `[` before the first `]`) is expanded,
/// then each produced name is expanded again until no group remains. A token
/// without brackets returns itself; an empty token yields nothing. A group
/// that is never closed, or that yields no number, makes the token expand to
/// nothing.
pub fn expand_brackets(token: &str) -> Vec<String> {
    if token.is_empty() {
        return Vec::new();
    }

    let mut open: Option<usize> = None;
    let mut group: Option<(usize, usize)> = None;

    for (idx, c) in token.char_indices() {
        match c {
            '[' => open = Some(idx),
            ']' => {
                if let Some(begin) = open {
                    group = Some((begin, idx));
                    break;
                }
            }
            _ => {}
        }
    }

    let Some((begin, end)) = group else {
        return if open.is_some() {
            Vec::new()
        } else {
            vec![token.to_string()]
        };
    };

    let prefix = &token[..begin];
    let suffix = &token[end + 1..];
    let mut names = Vec::new();
    for number in parse_range_list(&token[begin + 1..end]) {
        let candidate = format!("{prefix}{number}{suffix}");
        let expanded = expand_brackets(&candidate);
        if expanded.is_empty() {
            names.push(candidate);
        } else {
            names.extend(expanded);
        }
    }
    names
}

/// Parses `1-3,7` into `[1, 2, 3, 7]`.
///
/// Items that are neither an integer nor an `a-b` pair of integers are
/// skipped. A range whose start exceeds its end contributes nothing.
pub fn parse_range_list(ranges: &str) -> Vec<u64> {
    let mut numbers = Vec::new();
    for item in ranges.split(',') {
        if let Ok(n) = item.parse::<u64>() {
            numbers.push(n);
            continue;
        }
        let bounds: Vec<&str> = item.split('-').collect();
        if bounds.len() != 2 {
            continue;
        }
        let (Ok(begin), Ok(end)) = (bounds[0].parse::<u64>(), bounds[1].parse::<u64>()) else {
            continue;
        };
        numbers.extend(begin..=end);
    }
    numbers
}

/// Splits a full pattern and expands each token, preserving order.
pub fn expand(pattern: &str) -> Vec<String> {
    split(pattern)
        .iter()
        .flat_map(|token| expand_brackets(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_bracket_commas() {
        assert_eq!(split("cn[1-2,5],gpu1"), vec!["cn[1-2,5]", "gpu1"]);
        assert_eq!(split("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        assert_eq!(split("a,,b,"), vec!["a", "b"]);
        assert_eq!(split(""), vec![""]);
        assert_eq!(split(",,"), vec![""]);
    }

    #[test]
    fn test_split_unclosed_bracket_is_plain_text() {
        assert_eq!(split("cn[1,2"), vec!["cn[1", "2"]);
    }

    #[test]
    fn test_expand_brackets_single_group() {
        assert_eq!(expand_brackets("cn[1-3]"), vec!["cn1", "cn2", "cn3"]);
    }

    #[test]
    fn test_expand_brackets_multiple_groups() {
        assert_eq!(
            expand_brackets("r[1-2]n[1,3]"),
            vec!["r1n1", "r1n3", "r2n1", "r2n3"]
        );
    }

    #[test]
    fn test_expand_brackets_without_group() {
        assert_eq!(expand_brackets("login"), vec!["login"]);
    }

    #[test]
    fn test_expand_brackets_malformed() {
        assert!(expand_brackets("cn[1").is_empty());
        assert!(expand_brackets("cn[]").is_empty());
        assert!(expand_brackets("cn[a-b]").is_empty());
    }

    #[test]
    fn test_parse_range_list() {
        assert_eq!(parse_range_list("1-3,7"), vec![1, 2, 3, 7]);
        assert_eq!(parse_range_list("5"), vec![5]);
        assert_eq!(parse_range_list("3-1"), Vec::<u64>::new());
        assert_eq!(parse_range_list("x,1-2-3,4"), vec![4]);
        assert_eq!(parse_range_list(""), Vec::<u64>::new());
    }

    #[test]
    fn test_expand_full_pattern() {
        assert_eq!(
            expand("cn[1-2],login,gpu[10,12]"),
            vec!["cn1", "cn2", "login", "gpu10", "gpu12"]
        );
    }

    #[test]
    fn test_expand_empty_pattern() {
        assert!(expand("").is_empty());
        assert!(expand_brackets("").is_empty());
    }

    #[test]
    fn test_expand_cartesian_product() {
        assert_eq!(
            expand("cn[1,2]cn[2,5-7]"),
            vec![
                "cn1cn2", "cn1cn5", "cn1cn6", "cn1cn7", "cn2cn2", "cn2cn5", "cn2cn6", "cn2cn7"
            ]
        );
        assert_eq!(
            split("cn[1,2]cn[2,5-7],cn3,cn[4,5]"),
            vec!["cn[1,2]cn[2,5-7]", "cn3", "cn[4,5]"]
        );
    }

    #[test]
    fn test_parse_range_list_drops_only_malformed_items() {
        assert_eq!(parse_range_list("1,2,6-9"), vec![1, 2, 6, 7, 8, 9]);
        assert_eq!(parse_range_list("1,6-9a,2"), vec![1, 2]);
        assert_eq!(parse_range_list("1,6-9-10,2"), vec![1, 2]);
    }

    #[test]
    fn test_expand_keeps_duplicates_and_order() {
        assert_eq!(expand("cn[2,1,2]"), vec!["cn2", "cn1", "cn2"]);
    }
}
