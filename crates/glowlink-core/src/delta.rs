//! Region delta tracking
//!
//! Compares a new four-region sample against the previously transmitted one
//! and picks the smallest payload that still describes the change. Comparison
//! is exact equality on the 8-bit channel values, not perceptual distance.
//!
//! This module is stateless: the caller owns the "last sent" tuple and
//! commits the new one itself, before the send is issued, so a failed send
//! never rolls the baseline back.

use crate::frame::{RegionChange, UpdatePayload};
use crate::{Region, Rgb};

/// Regions whose color differs between `prev` and `next`, in canonical
/// order. `None` for `prev` is the unset sentinel of a fresh session and
/// reports every region as changed.
pub fn changed_regions(prev: Option<&[Rgb; 4]>, next: &[Rgb; 4]) -> Vec<Region> {
    match prev {
        None => Region::ALL.to_vec(),
        Some(prev) => Region::ALL
            .into_iter()
            .filter(|region| prev[region.index() as usize] != next[region.index() as usize])
            .collect(),
    }
}

/// Choose the payload for a frame: delta when one to three regions changed,
/// full otherwise. Zero changes still yield a full frame — the engine never
/// suppresses ticks, so the receiver sees a steady cadence.
pub fn payload_for(changed: &[Region], next: &[Rgb; 4]) -> UpdatePayload {
    if changed.is_empty() || changed.len() == 4 {
        UpdatePayload::Full(*next)
    } else {
        UpdatePayload::Delta(
            changed
                .iter()
                .map(|&region| RegionChange {
                    region,
                    color: next[region.index() as usize],
                })
                .collect(),
        )
    }
}
