//! Shell-style wildcard matching for `search_files`: `*`, `?`, `[abc]`,
//! `[a-z]` and negated `[!abc]` classes. Matching is case-sensitive and
//! covers the whole name.

pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0usize, 0usize);
    // Last `*` seen and the name position it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() {
            match p[pi] {
                '*' => {
                    backtrack = Some((pi, ni));
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ni += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(&p, pi, n[ni]) {
                        if matched {
                            pi = next;
                            ni += 1;
                            continue;
                        }
                    } else if n[ni] == '[' {
                        // Unterminated class: treat '[' as a literal.
                        pi += 1;
                        ni += 1;
                        continue;
                    }
                }
                c if c == n[ni] => {
                    pi += 1;
                    ni += 1;
                    continue;
                }
                _ => {}
            }
        }
        match backtrack {
            Some((star, absorbed)) => {
                pi = star + 1;
                ni = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Match `c` against the class opening at `p[start]`. Returns whether it
/// matched and the index just past the closing `]`, or `None` when the
/// class is never closed.
fn match_class(p: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = matches!(p.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;
    while i < p.len() {
        if p[i] == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;
        if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            if p[i] <= c && c <= p[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if p[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::wildcard_match;

    #[test]
    fn stars_and_question_marks() {
        assert!(wildcard_match("*.txt", "notes.txt"));
        assert!(wildcard_match("*.txt", ".txt"));
        assert!(!wildcard_match("*.txt", "notes.txt.bak"));
        assert!(wildcard_match("test_?.py", "test_1.py"));
        assert!(!wildcard_match("test_?.py", "test_12.py"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn character_classes() {
        assert!(wildcard_match("file[0-9].log", "file7.log"));
        assert!(!wildcard_match("file[0-9].log", "fileA.log"));
        assert!(wildcard_match("[!.]*", "visible"));
        assert!(!wildcard_match("[!.]*", ".hidden"));
        assert!(wildcard_match("[]]x", "]x"));
        assert!(wildcard_match("a[b", "a[b"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!wildcard_match("*.TXT", "a.txt"));
    }
}
