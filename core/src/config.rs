use serde::{Deserialize, Serialize};

/// Matcher tuning knobs. One record, serde-friendly so deployments can load
/// it from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Accept streaming binding relations without materializing them first.
    pub enable_streaming_joins: bool,
    /// Allow hash-join over a streaming binding relation of unknown size
    /// (the binding side is still drained before the scan side starts; a
    /// both-sides-streaming join lives in the executor above).
    pub enable_symmetric_hash_join: bool,
    /// Initial capacity of the hash-join build table.
    pub default_hash_table_size: usize,
    /// Binding-set size at or below which index-nested-loop is preferred.
    /// 0 disables the preference and forces hash-join.
    pub index_nested_loop_threshold: usize,
    /// Minimum binding density (bindings per unit of encoded key space
    /// between the first and last seek prefix) for iterator reuse; below it
    /// the selector falls back to hash-join. 0.0 keeps reuse always
    /// eligible.
    pub reuse_density_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            enable_streaming_joins: true,
            enable_symmetric_hash_join: true,
            default_hash_table_size: 64,
            index_nested_loop_threshold: 16,
            reuse_density_threshold: 0.0,
        }
    }
}
