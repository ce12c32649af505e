#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;

pub struct TestContext {
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Writes `content` under the temp dir and returns its path.
    pub fn write(&self, name: &str, content: &str) -> anyhow::Result<String> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path_str(&path))
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub const RULES_JSON: &str = r#"{
  "rules": [
    {
      "id": "cpu-high",
      "name": "CPU high",
      "metric": "cpu",
      "operator": "greater_than",
      "threshold": 80.0,
      "severity": "high",
      "actions": ["notify", "page"]
    },
    {
      "id": "disk-low",
      "metric": "disk_free",
      "operator": "lt",
      "threshold": 10.0,
      "resource_scope": "db-*"
    },
    {
      "id": "broken",
      "metric": "cpu",
      "operator": "between",
      "threshold": 1.0
    }
  ]
}"#;
