//! Common key sets for cumulus testing

use rand::seq::SliceRandom;
use rand::Rng;

/// The small project layout used throughout the docs
pub fn project_keys() -> Vec<&'static str> {
    vec![
        "proj/sub01.grp/data",
        "proj/sub01.grp/meta",
        "proj/sub02.grp/data",
    ]
}

/// A deeper layout mixing plain folders, containers and top-level files
pub fn experiment_keys() -> Vec<&'static str> {
    vec![
        "README",
        "auto/k1/anunez/proj/run01.hdf/fc6",
        "auto/k1/anunez/proj/run01.hdf/fc7",
        "auto/k8/anunez/proj/run01.hdf/fc6",
        "auto/k8/anunez/proj/run02.hdf/fc6",
        "auto/k8/anunez/proj/run02.hdf/fc8",
        "auto/k8/anunez/notes.txt",
        "data/2019/session-1/image_data",
        "data/2019/session-1/text_data",
        "data/2019/session-2/image_data",
        "data/2020/session-1/image_data",
    ]
}

const SEGMENTS: &[&str] = &[
    "a", "b", "ab", "ba", "a.b", "x1", "x2", "1x", "run01.grp", "run02.grp", "data", "meta",
];

/// Random keys built from a small alphabet of segments
///
/// Small alphabets make shared prefixes and glob hits likely.
pub fn random_keys<R: Rng>(rng: &mut R, count: usize, max_depth: usize) -> Vec<String> {
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let depth = rng.gen_range(1..=max_depth.max(1));
        let key = (0..depth)
            .map(|_| *SEGMENTS.choose(rng).unwrap_or(&"a"))
            .collect::<Vec<_>>()
            .join("/");
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

const PATTERN_SEGMENTS: &[&str] = &[
    "*", "?", "a*", "*b", "[ab]", "[!a]*", "x?", "*.grp", "data", "a", "run0[12].grp", "?.?",
];

/// Random patterns over the same segment alphabet
pub fn random_pattern<R: Rng>(rng: &mut R, max_depth: usize) -> String {
    let depth = rng.gen_range(1..=max_depth.max(1));
    (0..depth)
        .map(|_| {
            if rng.gen_bool(0.5) {
                *PATTERN_SEGMENTS.choose(rng).unwrap_or(&"*")
            } else {
                *SEGMENTS.choose(rng).unwrap_or(&"a")
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
