//! Spatial trap guard — rectangular zones tagged by trap intent.
//!
//! The guard is consulted before any click is dispatched: a point inside a
//! danger zone vetoes the attempt outright.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Trap intent of a declared zone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneKind {
    Safe,
    Danger,
    Decoy,
}

/// Axis-aligned rectangle with closed bounds on both edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialZone {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub kind: ZoneKind,
}

impl SpatialZone {
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Zones partitioned by kind, in zone-id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialReport {
    pub safe: Vec<SpatialZone>,
    pub danger: Vec<SpatialZone>,
    pub decoy: Vec<SpatialZone>,
}

/// Registry of declared zones, keyed by id.
#[derive(Debug, Default)]
pub struct SpatialGuard {
    zones: BTreeMap<String, SpatialZone>,
}

impl SpatialGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone. A duplicate id overwrites the earlier registration
    /// (last one wins); the displaced zone is returned.
    pub fn add_zone(&mut self, zone: SpatialZone) -> Option<SpatialZone> {
        tracing::debug!(id = %zone.id, kind = %zone.kind, "zone registered");
        self.zones.insert(zone.id.clone(), zone)
    }

    /// All registered zones partitioned by kind.
    #[must_use]
    pub fn spatial_report(&self) -> SpatialReport {
        let mut report = SpatialReport::default();
        for zone in self.zones.values() {
            match zone.kind {
                ZoneKind::Safe => report.safe.push(zone.clone()),
                ZoneKind::Danger => report.danger.push(zone.clone()),
                ZoneKind::Decoy => report.decoy.push(zone.clone()),
            }
        }
        report
    }

    /// True iff the point lies inside at least one danger zone.
    #[must_use]
    pub fn blocks_click(&self, x: f64, y: f64) -> bool {
        self.zones
            .values()
            .any(|zone| zone.kind == ZoneKind::Danger && zone.contains(x, y))
    }

    /// Every zone covering the point, regardless of kind.
    #[must_use]
    pub fn zones_at(&self, x: f64, y: f64) -> Vec<SpatialZone> {
        self.zones
            .values()
            .filter(|zone| zone.contains(x, y))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, x: f64, y: f64, w: f64, h: f64, kind: ZoneKind) -> SpatialZone {
        SpatialZone {
            id: id.into(),
            x,
            y,
            width: w,
            height: h,
            kind,
        }
    }

    #[test]
    fn empty_guard_blocks_nothing() {
        let guard = SpatialGuard::new();
        assert!(!guard.blocks_click(0.0, 0.0));
    }

    #[test]
    fn blocks_point_inside_danger_zone() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("trap", 10.0, 10.0, 50.0, 50.0, ZoneKind::Danger));
        assert!(guard.blocks_click(20.0, 20.0));
        assert!(!guard.blocks_click(1000.0, 1000.0));
    }

    #[test]
    fn zone_bounds_are_closed_on_both_edges() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("trap", 10.0, 10.0, 50.0, 50.0, ZoneKind::Danger));
        assert!(guard.blocks_click(10.0, 10.0));
        assert!(guard.blocks_click(60.0, 60.0));
        assert!(!guard.blocks_click(60.1, 60.0));
    }

    #[test]
    fn safe_and_decoy_zones_never_block() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("ok", 0.0, 0.0, 100.0, 100.0, ZoneKind::Safe));
        guard.add_zone(zone("bait", 0.0, 0.0, 100.0, 100.0, ZoneKind::Decoy));
        assert!(!guard.blocks_click(50.0, 50.0));
    }

    #[test]
    fn overlapping_danger_zones_block_once_is_enough() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("a", 0.0, 0.0, 30.0, 30.0, ZoneKind::Danger));
        guard.add_zone(zone("b", 20.0, 20.0, 30.0, 30.0, ZoneKind::Danger));
        assert!(guard.blocks_click(25.0, 25.0));
        assert_eq!(guard.zones_at(25.0, 25.0).len(), 2);
    }

    #[test]
    fn duplicate_id_overwrites_and_returns_displaced_zone() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("z", 0.0, 0.0, 10.0, 10.0, ZoneKind::Danger));
        let displaced = guard.add_zone(zone("z", 500.0, 500.0, 10.0, 10.0, ZoneKind::Safe));
        assert_eq!(displaced.unwrap().kind, ZoneKind::Danger);
        assert_eq!(guard.len(), 1);
        assert!(!guard.blocks_click(5.0, 5.0));
    }

    #[test]
    fn report_partitions_by_kind() {
        let mut guard = SpatialGuard::new();
        guard.add_zone(zone("a", 0.0, 0.0, 1.0, 1.0, ZoneKind::Safe));
        guard.add_zone(zone("b", 0.0, 0.0, 1.0, 1.0, ZoneKind::Danger));
        guard.add_zone(zone("c", 0.0, 0.0, 1.0, 1.0, ZoneKind::Danger));
        guard.add_zone(zone("d", 0.0, 0.0, 1.0, 1.0, ZoneKind::Decoy));
        let report = guard.spatial_report();
        assert_eq!(report.safe.len(), 1);
        assert_eq!(report.danger.len(), 2);
        assert_eq!(report.decoy.len(), 1);
    }
}
