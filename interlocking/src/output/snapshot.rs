//! Saved reservation state. Only the holder, kind and direction of each
//! reserved segment are kept; on load, records of convoys that no longer
//! exist are dropped.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::input::layout::Coord;
use crate::railway::convoy::{ConvoyHandle, ConvoyRegistry};
use crate::railway::infrastructure::Infrastructure;
use crate::railway::ribi::Ribi;
use crate::railway::segment::ReservationKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub tile: Coord,
    pub convoy: ConvoyHandle,
    pub kind: ReservationKind,
    pub direction: Ribi,
}

#[derive(Debug, Fail)]
pub enum SnapshotError {
    #[fail(display = "malformed snapshot: {}", _0)]
    Format(#[cause] serde_json::Error),
    #[fail(display = "snapshot refers to {:?}, which has no track", _0)]
    NoTrack(Coord),
}

/// One record per holder of every reserved segment.
pub fn save(inf: &Infrastructure) -> Vec<ReservationRecord> {
    let mut records = Vec::new();
    for (i, tile) in inf.layout.tiles.iter().enumerate() {
        let seg = &inf.segments[i];
        for h in &seg.holders {
            records.push(ReservationRecord { tile: tile.pos, convoy: *h, kind: seg.kind, direction: seg.direction });
        }
    }
    records
}

pub fn to_json(records: &[ReservationRecord]) -> Result<String, SnapshotError> {
    serde_json::to_string_pretty(records).map_err(SnapshotError::Format)
}

pub fn from_json(s: &str) -> Result<Vec<ReservationRecord>, SnapshotError> {
    serde_json::from_str(s).map_err(SnapshotError::Format)
}

/// Restores saved reservations. Records whose convoy is not in `convoys`
/// are skipped. Returns the number of records restored.
pub fn load(inf: &mut Infrastructure, convoys: &ConvoyRegistry, records: &[ReservationRecord])
            -> Result<usize, SnapshotError> {
    let mut restored = 0;
    for r in records {
        if inf.layout.track_tile(r.tile).is_none() {
            return Err(SnapshotError::NoTrack(r.tile));
        }
        if !convoys.contains(r.convoy) {
            debug!("dropping reservation at {:?} of a convoy that is gone", r.tile);
            continue;
        }
        if inf.reserve(r.tile, r.convoy, r.direction, r.kind) {
            restored += 1;
        } else {
            warn!("saved reservation at {:?} conflicts, skipped", r.tile);
        }
    }
    Ok(restored)
}
