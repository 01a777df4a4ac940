//! Tool selection: candidate set resolution, phase bucketing, and
//! within-phase topological ordering (spec §4.5).

use std::collections::{BTreeSet, HashMap, HashSet};

use qa_core::{CatalogSnapshot, PHASE_ORDER};

/// Resolves the candidate tool set for a run (spec §4.5 step 1).
pub fn candidate_set(
    snapshot: &CatalogSnapshot,
    only: &[String],
    languages: &[String],
    detected_languages: &[String],
) -> Vec<String> {
    if !only.is_empty() {
        return dedup_preserving_order(only);
    }

    let effective_languages: Vec<String> = if !languages.is_empty() {
        dedup_preserving_order(languages)
    } else {
        let mut detected = dedup_preserving_order(detected_languages);
        detected.sort();
        detected
    };

    if !effective_languages.is_empty() {
        let mut names = Vec::new();
        for lang in &effective_languages {
            for tool in snapshot.tools() {
                if tool.languages.iter().any(|l| l == lang) {
                    names.push(tool.name.clone());
                }
            }
        }
        if !names.is_empty() {
            return dedup_preserving_order(&names);
        }
    }

    dedup_preserving_order(
        &snapshot
            .tools()
            .iter()
            .filter(|t| t.default_enabled)
            .map(|t| t.name.clone())
            .collect::<Vec<_>>(),
    )
}

fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if seen.insert(name.clone()) {
            out.push(name.clone());
        }
    }
    out
}

/// Filter to names present in the registry, bucket by phase in canonical
/// order (unknown phases sorted lexicographically after), then topologically
/// order within each bucket (spec §4.5 steps 2-4).
pub fn order_tools(snapshot: &CatalogSnapshot, candidates: &[String]) -> Vec<String> {
    let ordered_input = dedup_preserving_order(candidates);
    let filtered: Vec<String> = ordered_input
        .iter()
        .filter(|name| snapshot.tool(name).is_some())
        .cloned()
        .collect();
    if filtered.is_empty() {
        return Vec::new();
    }

    let fallback_index: HashMap<&str, usize> = filtered
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut phase_groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut unknown_phases: BTreeSet<String> = BTreeSet::new();
    for name in &filtered {
        let tool = snapshot.tool(name).expect("filtered against snapshot");
        let phase = tool.phase.as_str().to_string();
        if tool.phase.canonical_rank().is_none() {
            unknown_phases.insert(phase.clone());
        }
        phase_groups.entry(phase).or_default().push(name.clone());
    }

    let mut bucketed: Vec<String> = Vec::new();
    for phase in PHASE_ORDER {
        if let Some(names) = phase_groups.get(phase) {
            bucketed.extend(order_phase(names, snapshot, &fallback_index));
        }
    }
    for phase in &unknown_phases {
        if let Some(names) = phase_groups.get(phase) {
            bucketed.extend(order_phase(names, snapshot, &fallback_index));
        }
    }

    let flattened: HashSet<&str> = bucketed.iter().map(String::as_str).collect();
    let remaining: Vec<String> = filtered
        .into_iter()
        .filter(|name| !flattened.contains(name.as_str()))
        .collect();

    bucketed.into_iter().chain(remaining).collect()
}

/// Kahn's algorithm over `after`/`before` edges restricted to this bucket.
/// Ties broken by original candidate index; a cycle falls back to the
/// bucket's unsorted order (spec §4.5 step 4).
fn order_phase(
    names: &[String],
    snapshot: &CatalogSnapshot,
    fallback_index: &HashMap<&str, usize>,
) -> Vec<String> {
    if names.len() <= 1 {
        return names.to_vec();
    }

    let name_set: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut dependencies: HashMap<&str, BTreeSet<&str>> =
        names.iter().map(|n| (n.as_str(), BTreeSet::new())).collect();

    for name in names {
        let tool = snapshot.tool(name).expect("filtered against snapshot");
        for dep in &tool.after {
            if name_set.contains(dep.as_str()) {
                dependencies.get_mut(name.as_str()).unwrap().insert(dep.as_str());
            }
        }
        for succ in &tool.before {
            if name_set.contains(succ.as_str()) {
                dependencies.get_mut(succ.as_str()).unwrap().insert(name.as_str());
            }
        }
    }

    match topological_sort(names, &dependencies, fallback_index) {
        Some(ordered) => ordered,
        None => names.to_vec(),
    }
}

fn topological_sort(
    names: &[String],
    dependencies: &HashMap<&str, BTreeSet<&str>>,
    fallback_index: &HashMap<&str, usize>,
) -> Option<Vec<String>> {
    let mut remaining: HashMap<&str, BTreeSet<&str>> = dependencies.clone();
    let mut ordered = Vec::with_capacity(names.len());

    while ordered.len() < names.len() {
        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if ready.is_empty() {
            return None;
        }
        ready.sort_by_key(|name| fallback_index.get(name).copied().unwrap_or(usize::MAX));
        let chosen = ready[0];
        ordered.push(chosen.to_string());
        remaining.remove(chosen);
        for deps in remaining.values_mut() {
            deps.remove(chosen);
        }
    }

    Some(ordered)
}
