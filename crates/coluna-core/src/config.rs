use serde::Deserialize;

/// Top-level engine configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MqConfig {
    pub shard: ShardConfig,
    pub scan: ScanConfig,
}

/// Shard bucketing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Width of one inbox time bucket in milliseconds. Changing this on an
    /// existing deployment strands rows in their old buckets — pin it.
    pub interval_ms: i64,
}

/// Ordered-scan configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Default number of messages returned by a scan when the caller does
    /// not pass a limit.
    pub page_size: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            interval_ms: 86_400_000,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}
