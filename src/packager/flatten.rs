//! Dependency flattening
//!
//! Scripts declare `requires` as relative paths to other scripts. Before
//! bundling, each script's list is replaced by its full transitive closure so
//! consumers never have to walk the graph themselves.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use super::descriptor::{ScriptDescriptor, normalize_script_path};

/// Replace every descriptor's `requires` with its deduplicated transitive closure.
///
/// Paths are matched against other descriptors' `main`. Paths that match no
/// descriptor are kept as leaves. Cycles terminate; a script that reaches
/// itself through its dependencies simply does not list itself.
#[must_use]
pub fn flatten(descriptors: &[ScriptDescriptor]) -> Vec<ScriptDescriptor> {
    let index: HashMap<String, &ScriptDescriptor> = descriptors
        .iter()
        .map(|d| (normalize_script_path(&d.main), d))
        .collect();

    descriptors
        .iter()
        .map(|descriptor| {
            let requires = expand_closure(descriptor, &index);
            ScriptDescriptor {
                requires,
                ..descriptor.clone()
            }
        })
        .collect()
}

/// Breadth-first expansion of one script's requirements.
fn expand_closure(
    root: &ScriptDescriptor,
    index: &HashMap<String, &ScriptDescriptor>,
) -> Vec<String> {
    let own = normalize_script_path(&root.main);
    let mut seen: HashSet<String> = HashSet::from([own.clone()]);
    let mut closure = Vec::new();
    let mut queue: VecDeque<String> = root
        .requires
        .iter()
        .map(|r| normalize_script_path(r))
        .collect();

    while let Some(path) = queue.pop_front() {
        if path == own {
            debug!(script = %root.name, "dependency cycle leads back to script; skipping self");
            continue;
        }
        if !seen.insert(path.clone()) {
            continue;
        }
        if let Some(dep) = index.get(&path) {
            queue.extend(dep.requires.iter().map(|r| normalize_script_path(r)));
        }
        closure.push(path);
    }

    closure
}
