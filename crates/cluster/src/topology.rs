//! Cluster topology description.

use serde_json::Value;
use std::collections::BTreeMap;

/// Immutable description of a cluster to bring up.
///
/// Consumed once by [`crate::ClusterManager::bring_up`]. Genesis
/// overrides patch every node's `genesis.json`; per-node overrides
/// patch that node's `config.json` and win over its defaults. Each set
/// is applied in declaration order.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    pub validator_count: usize,
    pub observer_count: usize,
    pub shard_count: u64,
    genesis_overrides: Vec<(String, Value)>,
    per_node_overrides: BTreeMap<usize, Vec<(String, Value)>>,
}

impl ClusterTopology {
    pub fn new(validator_count: usize, observer_count: usize, shard_count: u64) -> Self {
        ClusterTopology {
            validator_count,
            observer_count,
            shard_count,
            genesis_overrides: Vec::new(),
            per_node_overrides: BTreeMap::new(),
        }
    }

    /// Add a genesis override, applied to every node's `genesis.json`.
    pub fn with_genesis_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.genesis_overrides.push((key.into(), value));
        self
    }

    /// Add a `config.json` override for one node; wins over defaults.
    pub fn with_node_override(
        mut self,
        node_index: usize,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.per_node_overrides
            .entry(node_index)
            .or_default()
            .push((key.into(), value));
        self
    }

    pub fn total_nodes(&self) -> usize {
        self.validator_count + self.observer_count
    }

    pub(crate) fn genesis_overrides(&self) -> &[(String, Value)] {
        &self.genesis_overrides
    }

    pub(crate) fn node_overrides(&self, index: usize) -> &[(String, Value)] {
        self.per_node_overrides
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_and_overrides() {
        let topology = ClusterTopology::new(3, 1, 1)
            .with_genesis_override("epoch_length", json!(300))
            .with_node_override(2, "tracked_shards", json!([0]));

        assert_eq!(topology.total_nodes(), 4);
        assert_eq!(topology.genesis_overrides().len(), 1);
        assert_eq!(topology.node_overrides(2).len(), 1);
        assert!(topology.node_overrides(0).is_empty());
    }
}
