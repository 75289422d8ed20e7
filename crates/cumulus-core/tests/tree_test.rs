//! Integration tests for the virtual tree

use cumulus_core::naming::sanitize;
use cumulus_core::{Error, GroupKind, TreeOptions, VirtualTree};
use cumulus_testing::assertions::{assert_trees_equal, collect_leaf_sets};
use cumulus_testing::fixtures::{experiment_keys, project_keys, random_keys};
use cumulus_testing::{CountingBackend, MemoryBackend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_project_example() {
    let tree = VirtualTree::build("", MemoryBackend::with_keys(project_keys())).unwrap();

    let root = tree.root().expand().unwrap();
    assert_eq!(root.groups, names(&["proj"]));
    assert!(root.datasets.is_empty());

    let proj = tree.root().group("proj").unwrap().expand().unwrap();
    assert_eq!(proj.groups, names(&["sub01.grp", "sub02.grp"]));
    assert!(proj.datasets.is_empty());
}

#[test]
fn test_build_issues_one_listing() {
    let backend = CountingBackend::new(MemoryBackend::with_keys(experiment_keys()));
    let tree = VirtualTree::build("", &backend).unwrap();
    assert_eq!(backend.list_calls(), 1);

    let root = tree.root().expand().unwrap();
    assert_eq!(root.groups, names(&["auto", "data"]));
    assert_eq!(root.datasets, names(&["README"]));
    assert_eq!(backend.list_calls(), 1);
}

#[test]
fn test_expand_twice_lists_once() {
    let backend = CountingBackend::new(MemoryBackend::with_keys(experiment_keys()));
    let tree = VirtualTree::build("", &backend).unwrap();
    let data = tree.root().group("data").unwrap();

    data.expand().unwrap();
    data.expand().unwrap();
    assert_eq!(backend.list_calls(), 2);

    // child lookups on an expanded node do not list again
    data.child("NUM_2019").unwrap();
    data.child("2020").unwrap();
    assert_eq!(backend.list_calls(), 2);
}

#[test]
fn test_child_triggers_expansion() {
    let backend = CountingBackend::new(MemoryBackend::with_keys(experiment_keys()));
    let tree = VirtualTree::build("", &backend).unwrap();
    let auto = tree.root().group("auto").unwrap();
    assert!(!auto.is_expanded());

    let k8 = auto.child("k8").unwrap();
    assert!(auto.is_expanded());
    assert_eq!(k8.path(), "auto/k8");
    assert_eq!(backend.list_calls(), 2);
}

#[test]
fn test_rebuilding_is_idempotent() {
    let first = VirtualTree::build("", MemoryBackend::with_keys(experiment_keys())).unwrap();
    let second = VirtualTree::build("", MemoryBackend::sorted(experiment_keys())).unwrap();
    assert_trees_equal(&first, &second).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let keys = random_keys(&mut rng, 40, 4);
        let a = VirtualTree::build("", MemoryBackend::with_keys(keys.clone()));
        let b = VirtualTree::build("", MemoryBackend::with_keys(keys.clone()));
        match (a, b) {
            (Ok(a), Ok(b)) => {
                let left = collect_leaf_sets(&a);
                let right = collect_leaf_sets(&b);
                match (left, right) {
                    (Ok(left), Ok(right)) => assert_eq!(left, right),
                    (Err(_), Err(_)) => {}
                    _ => panic!("trees built from the same keys diverged"),
                }
            }
            (Err(_), Err(_)) => {}
            _ => panic!("trees built from the same keys diverged"),
        }
    }
}

#[test]
fn test_every_key_lands_in_its_parent_group() {
    let keys = experiment_keys();
    let tree = VirtualTree::build("", MemoryBackend::with_keys(keys.clone())).unwrap();
    let leaves = collect_leaf_sets(&tree).unwrap();

    let total: usize = leaves.values().map(|s| s.len()).sum();
    assert_eq!(total, keys.len());

    for key in keys {
        let (parent, name) = match key.rfind('/') {
            Some(idx) => (&key[..=idx], &key[idx + 1..]),
            None => ("", key),
        };
        assert!(leaves[parent].contains(name), "{} missing from {}", name, parent);
    }
}

#[test]
fn test_sanitized_names_are_distinct_or_collide_loudly() {
    let mut rng = StdRng::seed_from_u64(99);
    let tricky = ["a.b", "a_DOT_b", "1x", "NUM_1x", "x-y", "x_U2D_y", "fn", "fn_"];

    for _ in 0..30 {
        let extra = rng.gen_range(0..=tricky.len());
        let mut keys = random_keys(&mut rng, 30, 3);
        keys.extend(tricky.iter().take(extra).map(|t| format!("g/{}", t)));
        let tree = match VirtualTree::build("", MemoryBackend::with_keys(keys)) {
            Ok(tree) => tree,
            Err(Error::NameCollision { .. }) => continue,
            Err(e) => panic!("unexpected error: {e}"),
        };

        let mut stack = vec![tree.root()];
        while let Some(group) = stack.pop() {
            match group.expand() {
                Ok(listing) => {
                    let mut seen: HashMap<String, String> = HashMap::new();
                    for raw in listing.groups.iter().chain(&listing.datasets) {
                        let sanitized = sanitize(raw);
                        if let Some(other) = seen.insert(sanitized.clone(), raw.clone()) {
                            assert_eq!(&other, raw, "'{}' and '{}' share '{}'", other, raw, sanitized);
                        }
                    }
                    for name in &listing.groups {
                        stack.push(group.group(name).unwrap());
                    }
                }
                Err(Error::NameCollision { first, second, .. }) => {
                    assert_ne!(first, second);
                    assert_eq!(sanitize(&first), sanitize(&second));
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }
}

#[test]
fn test_collision_keeps_both_names_in_error() {
    let tree = VirtualTree::build("", MemoryBackend::with_keys(["g/x-y", "g/x_U2D_y"])).unwrap();
    let g = tree.root().group("g").unwrap();
    match g.child("x-y") {
        Err(Error::NameCollision {
            group,
            first,
            second,
            ..
        }) => {
            assert_eq!(group, "g");
            assert_eq!(first, "x-y");
            assert_eq!(second, "x_U2D_y");
        }
        other => panic!("expected NameCollision, got {:?}", other.map(|n| n.path())),
    }
}

#[test]
fn test_backend_failure_leaves_group_unexpanded() {
    let backend = CountingBackend::new(MemoryBackend::with_keys(project_keys()));
    let tree = VirtualTree::build("", &backend).unwrap();
    let proj = tree.root().group("proj").unwrap();

    backend.inner().set_unavailable(true);
    assert!(matches!(
        proj.expand(),
        Err(Error::BackendUnavailable { .. })
    ));
    assert!(!proj.is_expanded());

    backend.inner().set_unavailable(false);
    assert_eq!(proj.expand().unwrap().groups.len(), 2);
}

#[test]
fn test_build_fails_when_backend_is_down() {
    let backend = MemoryBackend::with_keys(project_keys());
    backend.set_unavailable(true);
    assert!(matches!(
        VirtualTree::build("", &backend),
        Err(Error::BackendUnavailable { .. })
    ));
}

#[test]
fn test_scoped_root() {
    let tree = VirtualTree::build("/auto/k8/", MemoryBackend::with_keys(experiment_keys())).unwrap();
    let root = tree.root();
    assert_eq!(root.path(), "auto/k8");
    assert_eq!(root.name(), "k8");
    assert_eq!(root.kind(), GroupKind::Root);
    assert_eq!(root.expand().unwrap().groups, names(&["anunez"]));

    let run = tree.open("anunez/proj/run02_DOT_hdf").unwrap().as_group().unwrap();
    assert_eq!(run.kind(), GroupKind::Container);
    assert_eq!(run.list().unwrap(), vec!["fc6", "fc8"]);
}

#[test]
fn test_custom_container_extensions() {
    let options = TreeOptions {
        container_extensions: vec![".zarr".to_string()],
    };
    let keys = ["a.zarr/x", "b.grp/y"];
    let tree = VirtualTree::build_with_options("", MemoryBackend::with_keys(keys), options).unwrap();
    assert_eq!(tree.root().group("a.zarr").unwrap().kind(), GroupKind::Container);
    assert_eq!(tree.root().group("b.grp").unwrap().kind(), GroupKind::Directory);
}

#[test]
fn test_descendants_and_dataset_access() {
    let backend = CountingBackend::new(MemoryBackend::new());
    backend.inner().insert("proj/a.grp/data", b"0123456789".to_vec());
    backend.inner().insert("proj/a.grp/meta", b"{}".to_vec());
    backend.inner().insert("proj/b.grp/data", Vec::new());

    let tree = VirtualTree::build("", &backend).unwrap();
    let proj = tree.root().group("proj").unwrap();
    assert_eq!(proj.descendants().unwrap().len(), 3);

    let data = tree.open("proj/a.grp/data").unwrap().as_dataset().unwrap();
    assert_eq!(backend.size_calls(), 0);
    assert_eq!(data.size().unwrap(), 10);
    assert_eq!(data.size().unwrap(), 10);
    assert_eq!(backend.size_calls(), 1);
    assert_eq!(data.read().unwrap(), b"0123456789");
    assert_eq!(data.info().unwrap().size, 10);
}

#[test]
fn test_empty_segments_get_their_own_groups() {
    let keys = ["a//b", "a/c", "/x"];
    let backend = CountingBackend::new(MemoryBackend::with_keys(keys));
    let tree = VirtualTree::build("", &backend).unwrap();

    let root = tree.root().expand().unwrap();
    assert_eq!(root.groups, names(&["", "a"]));

    let a = tree.root().group("a").unwrap();
    assert_eq!(a.expand().unwrap().groups, names(&[""]));
    assert_eq!(a.expand().unwrap().datasets, names(&["c"]));

    let blank = a.group("").unwrap();
    assert_eq!(blank.prefix(), "a//");
    assert_eq!(blank.name(), "");
    let listing = blank.expand().unwrap();
    assert!(listing.groups.is_empty());
    assert_eq!(listing.datasets, names(&["b"]));

    let b = tree.open("a//b").unwrap().as_dataset().unwrap();
    assert_eq!(b.key(), "a//b");
    assert_eq!(tree.open("a/_/b").unwrap().path(), "a//b");

    let x = tree.open("/x").unwrap().as_dataset().unwrap();
    assert_eq!(x.key(), "/x");
    assert_eq!(tree.root().group("").unwrap().prefix(), "/");

    let leaves = collect_leaf_sets(&tree).unwrap();
    let total: usize = leaves.values().map(|s| s.len()).sum();
    assert_eq!(total, keys.len());
    assert_eq!(leaves.len(), 4);
}
