//! "Did you mean?" name matching.
//!
//! Levenshtein distance with a length-scaled threshold, used by the typo
//! hypothesis.

/// Levenshtein edit distance between two strings.
///
/// Two-row dynamic program; O(len(a) · len(b)) time, O(len(b)) space.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b.chars().enumerate() {
            let cost = usize::from(a_char != b_char);

            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Distance threshold scaled to the name's length.
fn default_threshold(name_len: usize) -> usize {
    match name_len {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        n => (n / 2).min(5),
    }
}

/// Find the closest candidate within the threshold.
///
/// Exact matches are skipped (they would not be "unknown"). Returns the
/// winner and its distance.
pub fn closest_match<'a>(
    name: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<(&'a str, usize)> {
    if name.is_empty() {
        return None;
    }

    let threshold = default_threshold(name.len());
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        let len_diff = name.len().abs_diff(candidate.len());
        if len_diff > threshold || candidate == name {
            continue;
        }

        let distance = edit_distance(name, candidate);
        if distance <= threshold {
            let better = match best {
                None => true,
                Some((_, best_distance)) => distance < best_distance,
            };
            if better {
                best = Some((candidate, distance));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("hello", "hello"), 0);
        assert_eq!(edit_distance("hello", "helo"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn finds_close_name() {
        let candidates = ["length", "height", "width"];
        assert_eq!(
            closest_match("lenght", candidates.into_iter()),
            Some(("length", 2))
        );
    }

    #[test]
    fn far_names_are_ignored() {
        let candidates = ["alpha", "beta", "gamma"];
        assert_eq!(closest_match("xyz", candidates.into_iter()), None);
    }

    #[test]
    fn exact_match_is_skipped() {
        let candidates = ["speak", "sneak"];
        assert_eq!(
            closest_match("speak", candidates.into_iter()),
            Some(("sneak", 1))
        );
    }
}
