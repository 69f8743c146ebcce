//! "Did you mean" ranking for tool names, argument keys and enum values.

/// Lowercase alphanumerics only, so `repo_owner` and `repoOwner` compare equal.
fn fold(value: &str) -> Vec<char> {
    value
        .trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = (above + 1)
                .min(row[j] + 1)
                .min(diagonal + usize::from(ca != cb));
            diagonal = above;
        }
    }
    row[b.len()]
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Lower is closer; `None` means unrelated.
fn distance(input: &[char], candidate: &str) -> Option<usize> {
    let candidate = fold(candidate);
    if input.is_empty() || candidate.is_empty() {
        return None;
    }
    if input == candidate.as_slice() {
        return Some(0);
    }
    if contains(&candidate, input) || contains(input, &candidate) {
        return Some(1);
    }
    Some(edit_distance(input, &candidate))
}

fn tolerance(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => (len * 35 / 100).max(3),
    }
}

/// Up to `limit` candidates close to `input`, best first. Ties go to the
/// shorter, then alphabetically earlier, candidate.
pub fn suggest<S: AsRef<str>>(input: &str, candidates: &[S], limit: usize) -> Vec<String> {
    let folded = fold(input);
    if folded.is_empty() {
        return Vec::new();
    }
    let allowed = tolerance(folded.len());

    let mut ranked: Vec<(usize, &str)> = candidates
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|candidate| {
            distance(&folded, candidate)
                .filter(|score| *score <= allowed)
                .map(|score| (score, candidate))
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked
        .into_iter()
        .take(limit.max(1))
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}
