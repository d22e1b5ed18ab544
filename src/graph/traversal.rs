use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_CHAIN_DEPTH: usize = 3;
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Breadth-first expansion from `start` over `adjacency`, grouped by distance.
///
/// Each node is emitted at most once and `start` never appears, so cycles terminate.
/// Expansion stops after `max_depth` levels or when a level comes up empty.
pub fn bfs_levels(
    adjacency: &HashMap<String, BTreeSet<String>>,
    start: &str,
    max_depth: usize,
) -> Vec<Vec<String>> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);

    let mut levels = Vec::new();
    let mut frontier: Vec<&str> = vec![start];

    for _ in 0..max_depth.min(MAX_CHAIN_DEPTH) {
        let mut next = Vec::new();
        for node in &frontier {
            let Some(neighbours) = adjacency.get(*node) else {
                continue;
            };
            for neighbour in neighbours {
                if visited.insert(neighbour.as_str()) {
                    next.push(neighbour.as_str());
                }
            }
        }
        if next.is_empty() {
            break;
        }
        levels.push(next.iter().map(|s| s.to_string()).collect());
        frontier = next;
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(pairs: &[(&str, &str)]) -> HashMap<String, BTreeSet<String>> {
        let mut map: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (node, neighbour) in pairs {
            map.entry(node.to_string())
                .or_default()
                .insert(neighbour.to_string());
        }
        map
    }

    #[test]
    fn test_levels_follow_distance() {
        let adj = adjacency(&[("c", "b"), ("b", "a"), ("c", "x")]);
        let levels = bfs_levels(&adj, "c", 3);
        assert_eq!(levels, vec![vec!["b".to_string(), "x".to_string()], vec!["a".to_string()]]);
    }

    #[test]
    fn test_cycle_terminates() {
        let adj = adjacency(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let levels = bfs_levels(&adj, "a", 10);
        assert_eq!(levels, vec![vec!["b".to_string()], vec!["c".to_string()]]);
    }

    #[test]
    fn test_depth_cap() {
        let adj = adjacency(&[("a", "b"), ("b", "c"), ("c", "d")]);
        assert_eq!(bfs_levels(&adj, "a", 1).len(), 1);
        assert!(bfs_levels(&adj, "a", 0).is_empty());
    }
}
