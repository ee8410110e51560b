//! String similarity for mention/entity surface forms.

/// Character n-gram similarity in `[0, 1]` (Dice coefficient over the two
/// n-gram multisets). Used with n=2 on lower-cased names when scoring
/// candidates.
pub fn ngram_similarity(s: &str, t: &str, n: usize) -> f64 {
    debug_assert!(n > 0);
    if s == t {
        return 1.0;
    }
    if s.is_empty() || t.is_empty() {
        return 0.0;
    }

    let mut grams1 = ngrams(s, n);
    let grams2 = ngrams(t, n);
    if grams1.is_empty() || grams2.is_empty() {
        return 0.0;
    }

    let total = grams1.len() + grams2.len();
    let mut shared = 0usize;
    for gram in &grams2 {
        if let Some(at) = grams1.iter().position(|g| g == gram) {
            grams1.swap_remove(at);
            shared += 1;
        }
    }

    2.0 * shared as f64 / total as f64
}

/// All n-grams of the string, with the head padded so short prefixes still
/// produce a gram per character.
fn ngrams(s: &str, n: usize) -> Vec<Vec<char>> {
    let mut chars: Vec<char> = std::iter::repeat('\u{0}').take(n - 1).collect();
    chars.extend(s.chars());
    chars.windows(n).map(<[char]>::to_vec).collect()
}

/// Levenshtein edit distance over code points.
pub fn edit_distance(s: &str, t: &str) -> usize {
    let s: Vec<char> = s.chars().collect();
    let t: Vec<char> = t.chars().collect();
    let (n, m) = (s.len(), t.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut row = vec![0usize; m + 1];
    for i in 1..=n {
        row[0] = i;
        for j in 1..=m {
            let cost = usize::from(s[i - 1] != t[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[m]
}

/// Edit distance scaled to a similarity (1 = identical). With an empty side
/// the raw length of the other side comes back instead of a ratio.
pub fn edit_distance_score(s: &str, t: &str) -> f64 {
    let n = s.chars().count();
    let m = t.chars().count();
    if n == 0 {
        return m as f64;
    }
    if m == 0 {
        return n as f64;
    }
    1.0 - edit_distance(s, t) as f64 / n.max(m) as f64
}

/// Length of the longest common substring of `s` and `t`.
pub fn longest_common_substring(s: &str, t: &str) -> usize {
    let s: Vec<char> = s.chars().collect();
    let t: Vec<char> = t.chars().collect();
    if s.is_empty() || t.is_empty() {
        return 0;
    }

    let mut longest = 0;
    let mut table = vec![vec![0usize; t.len()]; s.len()];
    for i in 0..s.len() {
        for j in 0..t.len() {
            if s[i] != t[j] {
                continue;
            }
            table[i][j] = if i == 0 || j == 0 {
                1
            } else {
                table[i - 1][j - 1] + 1
            };
            longest = longest.max(table[i][j]);
        }
    }
    longest
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngram_identical() {
        assert_eq!(ngram_similarity("alberta", "alberta", 2), 1.0);
    }

    #[test]
    fn test_ngram_disjoint() {
        assert_eq!(ngram_similarity("abc", "xyz", 2), 0.0);
    }

    #[test]
    fn test_ngram_partial_overlap_ranks_sensibly() {
        let close = ngram_similarity("paris", "paris, texas", 2);
        let far = ngram_similarity("paris", "houston", 2);
        assert!(close > far);
        assert!(close > 0.0 && close < 1.0);
    }

    #[test]
    fn test_ngram_empty() {
        assert_eq!(ngram_similarity("", "abc", 2), 0.0);
        assert_eq!(ngram_similarity("", "", 2), 1.0);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_edit_distance_score() {
        assert_eq!(edit_distance_score("same", "same"), 1.0);
        assert!(edit_distance_score("kitten", "sitting") < 1.0);
    }

    #[test]
    fn test_longest_common_substring() {
        assert_eq!(longest_common_substring("edmonton", "monton"), 6);
        assert_eq!(longest_common_substring("abc", "xyz"), 0);
        assert_eq!(longest_common_substring("", "abc"), 0);
    }
}
