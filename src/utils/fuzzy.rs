// Near-match suggestions for project paths

use strsim::levenshtein;

/// Maximum edit distance for a path to count as a near match
pub const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Find up to 5 known paths close to `search`, closest first
///
/// A path matches when its edit distance to `search` is small, or when it
/// contains `search` (prefix matches rank ahead of inner matches). Matching
/// is case-insensitive.
pub fn suggest_paths<'a, I>(search: &str, paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = search.to_lowercase();
    let mut matches: Vec<(usize, &str)> = Vec::new();

    for path in paths {
        let candidate = path.to_lowercase();
        let distance = levenshtein(&needle, &candidate);
        if distance <= MAX_SUGGESTION_DISTANCE {
            matches.push((distance, path));
            continue;
        }

        // Also try the leaf segment, so `Backend` finds `Client.Backend`
        let leaf = candidate.rsplit('.').next().unwrap_or(&candidate);
        if levenshtein(&needle, leaf) <= 1 {
            matches.push((MAX_SUGGESTION_DISTANCE, path));
        } else if needle.len() < candidate.len() && candidate.contains(&needle) {
            let penalty = if candidate.starts_with(&needle) { 0 } else { 1 };
            matches.push((MAX_SUGGESTION_DISTANCE + penalty, path));
        }
    }

    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    matches
        .into_iter()
        .take(5)
        .map(|(_, path)| path.to_string())
        .collect()
}
