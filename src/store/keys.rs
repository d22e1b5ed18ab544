pub const CONCEPT_PREFIX: &str = "concept:";
pub const EDGE_PREFIX: &str = "edge:";
pub const LEARNER_PREFIX: &str = "learner:";
pub const STATE_PREFIX: &str = "state:";

const SEPARATOR: char = ':';

pub fn concept_key(concept_id: &str) -> String {
    format!("{CONCEPT_PREFIX}{concept_id}")
}

pub fn edge_key(from: &str, to: &str) -> String {
    format!("{EDGE_PREFIX}{from}:{to}")
}

pub fn edges_from_prefix(from: &str) -> String {
    format!("{EDGE_PREFIX}{from}:")
}

pub fn learner_key(user_id: &str) -> String {
    format!("{LEARNER_PREFIX}{user_id}")
}

pub fn state_key(user_id: &str, concept_id: &str) -> String {
    format!("{STATE_PREFIX}{user_id}:{concept_id}")
}

pub fn user_states_prefix(user_id: &str) -> String {
    format!("{STATE_PREFIX}{user_id}:")
}

/// Ids are embedded in composite keys, so they may not contain the separator.
pub fn is_valid_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_keys_share_source_prefix() {
        assert!(edge_key("a", "b").starts_with(&edges_from_prefix("a")));
        assert!(!edge_key("ab", "c").starts_with(&edges_from_prefix("a")));
    }

    #[test]
    fn test_id_validation() {
        assert!(is_valid_id("algebra-1"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("   "));
        assert!(!is_valid_id("a:b"));
    }
}
