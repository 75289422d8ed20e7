//! Common assertions for cumulus testing

use anyhow::Result;
use cumulus_core::backend::KeyBackend;
use cumulus_core::tree::{Group, VirtualTree};
use std::collections::{BTreeMap, BTreeSet};

/// Expand every group and map each group's listing prefix to the datasets
/// directly in it
pub fn collect_leaf_sets<B: KeyBackend>(
    tree: &VirtualTree<B>,
) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut map = BTreeMap::new();
    collect_group(tree.root(), &mut map)?;
    Ok(map)
}

fn collect_group<B: KeyBackend>(
    group: Group<'_, B>,
    map: &mut BTreeMap<String, BTreeSet<String>>,
) -> Result<()> {
    let listing = group.expand()?;
    map.insert(group.prefix(), listing.datasets.clone());

    for name in &listing.groups {
        collect_group(group.group(name)?, map)?;
    }
    Ok(())
}

/// Asserts that two trees have identical prefix -> leaf-set mappings
pub fn assert_trees_equal<A: KeyBackend, B: KeyBackend>(
    left: &VirtualTree<A>,
    right: &VirtualTree<B>,
) -> Result<()> {
    let left = collect_leaf_sets(left)?;
    let right = collect_leaf_sets(right)?;

    assert_eq!(
        left.keys().collect::<Vec<_>>(),
        right.keys().collect::<Vec<_>>(),
        "Different group prefixes"
    );
    for (path, leaves) in &left {
        assert_eq!(Some(leaves), right.get(path), "Leaf mismatch in group '{}'", path);
    }

    Ok(())
}

/// Reference glob over a complete key listing
///
/// Matches segment by segment with one `glob::Pattern` per segment, with no
/// literal-prefix handling at all.
pub fn oracle_glob<S: AsRef<str>>(keys: &[S], pattern: &str) -> Result<Vec<String>> {
    let segments = pattern
        .split('/')
        .map(glob::Pattern::new)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(keys
        .iter()
        .map(|k| k.as_ref())
        .filter(|k| {
            let parts: Vec<&str> = k.split('/').collect();
            parts.len() == segments.len()
                && parts.iter().zip(&segments).all(|(part, seg)| seg.matches(part))
        })
        .map(str::to_string)
        .collect())
}
