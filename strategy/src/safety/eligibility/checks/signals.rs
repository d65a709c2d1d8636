use std::collections::HashSet;

/// Names present in `set`, sorted and without repeats.
pub fn intersecting<'a, I>(names: I, set: &HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hits: Vec<String> = names
        .into_iter()
        .filter(|name| set.contains(*name))
        .map(str::to_string)
        .collect();
    hits.sort();
    hits.dedup();
    hits
}
