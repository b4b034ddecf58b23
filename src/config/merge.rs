//! Configuration merge logic
//!
//! Layered deep merge:
//! - Mappings: deep-merge by key, except below declared replace nodes
//! - Lists: REPLACE (last wins)
//! - Scalars: override (last wins)

use crate::value::{ConfigMap, ConfigValue};

/// Where the merge stops recursing.
///
/// A replace node is a mapping whose children are assigned wholesale instead
/// of merged. Paired keys at a replace node travel together: when the overlay
/// sets only one of them, the other is dropped from the base.
#[derive(Debug, Clone, Default)]
pub struct MergePolicy {
    replace_nodes: Vec<Vec<String>>,
    paired_keys: Vec<(String, String)>,
}

impl MergePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy used when applying environment overrides: every
    /// `files.<type>` node replaces its children, and `joinTo` and
    /// `entryPoints` must be overridden together.
    pub fn cascade() -> Self {
        Self::new()
            .replace_children_of("files.*")
            .paired("joinTo", "entryPoints")
    }

    /// Declare a replace node by dot path. `*` matches any single key.
    pub fn replace_children_of(mut self, path: &str) -> Self {
        self.replace_nodes
            .push(path.split('.').map(str::to_string).collect());
        self
    }

    pub fn paired(mut self, a: &str, b: &str) -> Self {
        self.paired_keys.push((a.to_string(), b.to_string()));
        self
    }

    fn is_replace_node(&self, path: &[String]) -> bool {
        self.replace_nodes.iter().any(|pattern| {
            pattern.len() == path.len()
                && pattern
                    .iter()
                    .zip(path)
                    .all(|(want, have)| want == "*" || want == have)
        })
    }

    fn reset_pairs(&self, base: &mut ConfigMap, overlay: &ConfigMap) {
        for (a, b) in &self.paired_keys {
            match (overlay.contains_key(a), overlay.contains_key(b)) {
                (true, false) => {
                    base.shift_remove(b);
                }
                (false, true) => {
                    base.shift_remove(a);
                }
                _ => {}
            }
        }
    }
}

/// Deep merge two values under `policy`.
///
/// Merge semantics:
/// - Mappings: deep-merge by key, keeping the base's key order
/// - Lists: REPLACE (overlay wins entirely)
/// - Scalars, regexes, predicates: override (overlay wins)
/// - Null: override (null can override any value)
pub fn deep_merge_with(base: ConfigValue, overlay: ConfigValue, policy: &MergePolicy) -> ConfigValue {
    let mut path = Vec::new();
    merge_at(base, overlay, policy, &mut path)
}

fn merge_at(
    base: ConfigValue,
    overlay: ConfigValue,
    policy: &MergePolicy,
    path: &mut Vec<String>,
) -> ConfigValue {
    match (base, overlay) {
        (ConfigValue::Map(mut base_map), ConfigValue::Map(overlay_map)) => {
            if policy.is_replace_node(path) {
                policy.reset_pairs(&mut base_map, &overlay_map);
                for (key, value) in overlay_map {
                    base_map.insert(key, value);
                }
                return ConfigValue::Map(base_map);
            }

            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::replace(slot, ConfigValue::Null);
                        path.push(key);
                        *slot = merge_at(base_value, overlay_value, policy, path);
                        path.pop();
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            ConfigValue::Map(base_map)
        }

        // Lists: REPLACE (no concatenation)
        (ConfigValue::List(_), overlay @ ConfigValue::List(_)) => overlay,

        // Scalars and any other case: overlay wins
        (_, overlay) => overlay,
    }
}
