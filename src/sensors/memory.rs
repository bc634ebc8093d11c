use std::sync::Arc;

use tokio::sync::RwLock;

use super::store::HistoryQuery;
use crate::db::models::SensorReading;

/// Append-only in-memory reading log, used when no database is configured.
///
/// Cloning shares the same log.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Vec<SensorReading>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, reading: SensorReading) {
        self.inner.write().await.push(reading);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn latest(&self) -> Option<SensorReading> {
        self.inner
            .read()
            .await
            .iter()
            .max_by_key(|r| r.recorded_at)
            .cloned()
    }

    /// Returns the requested page and the total number of matching readings.
    pub async fn query(&self, q: &HistoryQuery) -> (Vec<SensorReading>, u64) {
        let guard = self.inner.read().await;
        let mut matching: Vec<&SensorReading> = guard
            .iter()
            .filter(|r| q.start.is_none_or(|start| r.recorded_at >= start))
            .filter(|r| q.end.is_none_or(|end| r.recorded_at <= end))
            .collect();
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(q.offset() as usize)
            .take(q.limit as usize)
            .cloned()
            .collect();
        (data, total)
    }

    pub async fn leaks(&self, limit: usize) -> Vec<SensorReading> {
        let guard = self.inner.read().await;
        let mut leaks: Vec<&SensorReading> = guard.iter().filter(|r| r.leak_detected).collect();
        leaks.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        leaks.into_iter().take(limit).cloned().collect()
    }
}
