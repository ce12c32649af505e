use parking_lot::Mutex;
use snowflake::SnowflakeIdBucket;

/// Snowflake-backed generator for alert ids.
///
/// Each engine owns its own generator; ids are numeric strings that are
/// unique for a given `(machine_id, node_id)` pair.
pub struct IdGenerator {
    bucket: Mutex<SnowflakeIdBucket>,
}

impl IdGenerator {
    /// `machine_id` and `node_id` must both be in `0..=31`.
    pub fn new(machine_id: i32, node_id: i32) -> Self {
        Self {
            bucket: Mutex::new(SnowflakeIdBucket::new(machine_id, node_id)),
        }
    }

    pub fn next_id(&self) -> String {
        self.bucket.lock().get_id().to_string()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}
