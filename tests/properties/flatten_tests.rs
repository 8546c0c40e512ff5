//! Property-based tests for dependency flattening over arbitrary graphs,
//! cycles and unresolved paths included.

use std::collections::HashSet;

use proptest::prelude::*;

use scriptpack::packager::{ScriptDescriptor, flatten};

/// `n` scripts `s0.js..`, each requiring indices up to `n + 2`; the extra
/// indices name scripts that do not exist.
fn arb_scripts() -> impl Strategy<Value = Vec<ScriptDescriptor>> {
    (1usize..8).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(0..n + 2, 0..5), n).prop_map(|edges| {
            edges
                .into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    ScriptDescriptor::new(format!("s{i}.js"))
                        .with_static(i % 2 == 0)
                        .with_requires(deps.into_iter().map(|d| format!("./s{d}.js")))
                })
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn flattened_requires_never_contain_self_or_duplicates(scripts in arb_scripts()) {
        for script in flatten(&scripts) {
            let unique: HashSet<&String> = script.requires.iter().collect();
            prop_assert_eq!(unique.len(), script.requires.len());
            prop_assert!(!script.requires.contains(&script.main));
        }
    }

    #[test]
    fn flattened_requires_are_transitively_closed(scripts in arb_scripts()) {
        let flat = flatten(&scripts);
        for script in &flat {
            for dep in &script.requires {
                if let Some(inner) = flat.iter().find(|d| &d.main == dep) {
                    for transitive in &inner.requires {
                        prop_assert!(
                            transitive == &script.main || script.requires.contains(transitive),
                            "{} misses {} via {}", script.main, transitive, dep
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn direct_requires_are_kept(scripts in arb_scripts()) {
        let flat = flatten(&scripts);
        for (before, after) in scripts.iter().zip(&flat) {
            prop_assert_eq!(&before.name, &after.name);
            for dep in &before.requires {
                let normalized = dep.trim_start_matches("./").to_string();
                prop_assert!(normalized == after.main || after.requires.contains(&normalized));
            }
        }
    }

    #[test]
    fn flattening_is_idempotent(scripts in arb_scripts()) {
        let once = flatten(&scripts);
        let twice = flatten(&once);
        prop_assert_eq!(twice, once);
    }
}
