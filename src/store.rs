use std::collections::HashMap;

use crate::model::{TrajectoryPoint, VesselRecord};

/// Default number of history points kept per vessel.
pub const DEFAULT_TRAJECTORY_CAPACITY: usize = 100;

/// Latest known record per vessel identity.
#[derive(Debug, Clone, Default)]
pub struct VesselStateStore {
    vessels: HashMap<String, VesselRecord>,
}

impl VesselStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or replace only when `record` is strictly newer.
    /// Returns whether the store changed.
    pub fn upsert(&mut self, record: VesselRecord) -> bool {
        match self.vessels.get(&record.id) {
            Some(existing) if record.timestamp <= existing.timestamp => false,
            _ => {
                self.vessels.insert(record.id.clone(), record);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&VesselRecord> {
        self.vessels.get(id)
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Current records in unspecified order.
    pub fn snapshot(&self) -> Vec<VesselRecord> {
        self.vessels.values().cloned().collect()
    }

    pub fn into_snapshot(self) -> Vec<VesselRecord> {
        self.vessels.into_values().collect()
    }

    /// Records ordered by name, then id.
    pub fn sorted_snapshot(&self) -> Vec<VesselRecord> {
        let mut vessels = self.snapshot();
        sort_for_display(&mut vessels);
        vessels
    }

    /// Fold another store in, applying latest-wins per vessel.
    pub fn merge(&mut self, other: VesselStateStore) {
        for record in other.vessels.into_values() {
            self.upsert(record);
        }
    }
}

impl FromIterator<VesselRecord> for VesselStateStore {
    fn from_iter<I: IntoIterator<Item = VesselRecord>>(iter: I) -> Self {
        let mut store = VesselStateStore::new();
        for record in iter {
            store.upsert(record);
        }
        store
    }
}

pub fn sort_for_display(vessels: &mut [VesselRecord]) {
    vessels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

/// Capacity-bounded position history per vessel.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct TrajectoryStore {
    #[serde(skip)]
    capacity: usize,
    tracks: HashMap<String, Vec<TrajectoryPoint>>,
}

impl Default for TrajectoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRAJECTORY_CAPACITY)
    }
}

impl TrajectoryStore {
    /// `capacity` must be at least one; the pipeline checks this up front.
    pub fn new(capacity: usize) -> Self {
        TrajectoryStore {
            capacity: capacity.max(1),
            tracks: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append at the tail and evict from the front past capacity.
    /// Out-of-order points are not re-sorted here.
    pub fn append(&mut self, id: &str, point: TrajectoryPoint) {
        let track = self.tracks.entry(id.to_string()).or_default();
        track.push(point);
        if track.len() > self.capacity {
            let excess = track.len() - self.capacity;
            track.drain(..excess);
        }
    }

    /// The vessel's points, or an empty slice for unknown ids.
    pub fn get(&self, id: &str) -> &[TrajectoryPoint] {
        self.tracks.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TrajectoryPoint])> {
        self.tracks.iter().map(|(id, t)| (id.as_str(), t.as_slice()))
    }

    /// Stable sort of every track by timestamp.
    pub fn sort_chronologically(&mut self) {
        for track in self.tracks.values_mut() {
            track.sort_by_key(|p| p.timestamp);
        }
    }

    /// Combine histories, keeping the `capacity` most recent points per vessel.
    pub fn merge(&mut self, other: TrajectoryStore) {
        for (id, points) in other.tracks {
            let track = self.tracks.entry(id).or_default();
            track.extend(points);
            track.sort_by_key(|p| p.timestamp);
            if track.len() > self.capacity {
                let excess = track.len() - self.capacity;
                track.drain(..excess);
            }
        }
    }
}
