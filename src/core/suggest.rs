//! Fuzzy "did you mean" suggestions for near-miss names

/// Largest edit distance still considered a near miss
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Maximum number of suggestions returned
pub const MAX_SUGGESTIONS: usize = 3;

/// Rank candidates close to `query`
///
/// Distances are computed case-insensitively so `Daily_ETL` still surfaces
/// `daily_etl`. Candidates within [`MAX_SUGGESTION_DISTANCE`] are ranked by
/// distance, then alphabetically, and capped at [`MAX_SUGGESTIONS`]. An exact
/// (case-sensitive) match is never suggested back.
pub fn suggest<'a, I>(query: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_lower = query.to_lowercase();

    let mut ranked: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|c| *c != query)
        .map(|c| (levenshtein(&query_lower, &c.to_lowercase()), c))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .collect();

    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, c)| c.to_string())
        .collect()
}

/// Levenshtein edit distance (insertions, deletions, substitutions)
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows instead of the full matrix
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Render a suggestion list as a "did you mean" sentence
pub fn did_you_mean(suggestions: &[String]) -> Option<String> {
    match suggestions {
        [] => None,
        [one] => Some(format!("Did you mean '{}'?", one)),
        many => {
            let quoted: Vec<String> = many.iter().map(|s| format!("'{}'", s)).collect();
            Some(format!("Did you mean one of: {}?", quoted.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("daly_etl", "daily_etl"), 1);
        assert_eq!(levenshtein("dialy_etl", "daily_etl"), 2);
        assert_eq!(levenshtein("stage", "staging"), 3);
    }

    #[test]
    fn test_suggest_ranks_closest_first() {
        let known = ["daily_etl", "hourly_etl"];
        let suggestions = suggest("daly_etl", known.iter().copied());
        assert_eq!(suggestions.first().map(String::as_str), Some("daily_etl"));
    }

    #[test]
    fn test_suggest_transposition() {
        let known = ["daily_etl", "hourly_etl"];
        assert_eq!(suggest("dialy_etl", known.iter().copied()), vec!["daily_etl"]);
    }

    #[test]
    fn test_suggest_surfaces_case_variant() {
        let known = ["daily_etl"];
        assert_eq!(suggest("Daily_ETL", known.iter().copied()), vec!["daily_etl"]);
    }

    #[test]
    fn test_suggest_ties_sorted_alphabetically_and_capped() {
        let known = ["abd", "abc", "abe", "abf", "xyz"];
        let suggestions = suggest("abx", known.iter().copied());
        assert_eq!(suggestions, vec!["abc", "abd", "abe"]);
    }

    #[test]
    fn test_suggest_nothing_close() {
        let known = ["daily_etl"];
        assert!(suggest("completely_different", known.iter().copied()).is_empty());
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(did_you_mean(&[]), None);
        assert_eq!(did_you_mean(&["a".to_string()]).unwrap(), "Did you mean 'a'?");
        assert_eq!(
            did_you_mean(&["a".to_string(), "b".to_string()]).unwrap(),
            "Did you mean one of: 'a', 'b'?"
        );
    }
}
