use chrono::{DateTime, Utc};
use cloudguard_common::types::Metric;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Arrival-ordered samples for one resource, capped at `capacity`.
pub struct ResourceSeries {
    capacity: usize,
    data: VecDeque<Metric>,
}

impl ResourceSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }

    /// Appends and evicts from the front until back at capacity.
    pub fn push(&mut self, metric: Metric) {
        self.data.push_back(metric);
        while self.data.len() > self.capacity {
            self.data.pop_front();
        }
    }

    /// Up to `n` latest samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Metric> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).cloned().collect()
    }

    /// Up to `n` latest samples of one metric, oldest first.
    pub fn recent_for_metric(&self, metric_name: &str, n: usize) -> Vec<Metric> {
        let mut out: Vec<Metric> = self
            .data
            .iter()
            .rev()
            .filter(|m| m.metric_name == metric_name)
            .take(n)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    /// Removes samples with `timestamp < cutoff`. Returns how many went.
    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.data.len();
        self.data.retain(|m| m.timestamp >= cutoff);
        before - self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// In-memory sliding window of recent samples, keyed by resource.
///
/// Each resource has its own lock so ingestion for different resources
/// never contends. The outer map lock is only taken for writing when a
/// resource is first seen or when empty series are dropped.
pub struct MetricBuffer {
    capacity: usize,
    series: RwLock<HashMap<String, Arc<Mutex<ResourceSeries>>>>,
}

impl MetricBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the series for `resource_id`, creating it on first use.
    pub fn series(&self, resource_id: &str) -> Arc<Mutex<ResourceSeries>> {
        if let Some(series) = self.series.read().get(resource_id) {
            return series.clone();
        }
        self.series
            .write()
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ResourceSeries::new(self.capacity))))
            .clone()
    }

    pub fn append(&self, metric: Metric) {
        let series = self.series(&metric.resource_id);
        series.lock().push(metric);
    }

    /// Empty for an unknown resource.
    pub fn recent(&self, resource_id: &str, n: usize) -> Vec<Metric> {
        match self.get(resource_id) {
            Some(series) => series.lock().recent(n),
            None => Vec::new(),
        }
    }

    pub fn recent_for_metric(&self, resource_id: &str, metric_name: &str, n: usize) -> Vec<Metric> {
        match self.get(resource_id) {
            Some(series) => series.lock().recent_for_metric(metric_name, n),
            None => Vec::new(),
        }
    }

    pub fn prune_older_than(&self, resource_id: &str, cutoff: DateTime<Utc>) -> usize {
        match self.get(resource_id) {
            Some(series) => series.lock().prune_older_than(cutoff),
            None => 0,
        }
    }

    /// Prunes every resource and forgets the ones left empty.
    ///
    /// Series are pruned one at a time without the map lock; the write
    /// lock is taken only to drop series that came out empty.
    pub fn prune_all(&self, cutoff: DateTime<Utc>) -> usize {
        let snapshot: Vec<(String, Arc<Mutex<ResourceSeries>>)> = self
            .series
            .read()
            .iter()
            .map(|(id, series)| (id.clone(), series.clone()))
            .collect();

        let mut removed = 0;
        let mut emptied = Vec::new();
        for (id, series) in snapshot {
            let mut guard = series.lock();
            removed += guard.prune_older_than(cutoff);
            if guard.is_empty() {
                emptied.push(id);
            }
        }

        if !emptied.is_empty() {
            let mut map = self.series.write();
            for id in emptied {
                // A series still referenced elsewhere may be mid-ingest.
                let idle = map
                    .get(&id)
                    .is_some_and(|s| Arc::strong_count(s) == 1 && s.lock().is_empty());
                if idle {
                    map.remove(&id);
                }
            }
        }
        removed
    }

    pub fn resource_ids(&self) -> Vec<String> {
        self.series.read().keys().cloned().collect()
    }

    pub fn resource_count(&self) -> usize {
        self.series.read().len()
    }

    pub fn sample_count(&self) -> usize {
        self.series.read().values().map(|s| s.lock().len()).sum()
    }

    /// The series for `resource_id`, if one exists.
    pub fn get(&self, resource_id: &str) -> Option<Arc<Mutex<ResourceSeries>>> {
        self.series.read().get(resource_id).cloned()
    }
}
