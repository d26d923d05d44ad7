//! Per-record capacity figures.

use preschool_analytics_models::{KindergartenSort, ListKindergartensParams};
use preschool_kindergarten_models::{CRITICAL_OCCUPANCY, KindergartenRecord, KindergartenView};

/// `enrolled / capacity`, or 0 when capacity is not positive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn occupancy(capacity: i64, enrolled: i64) -> f64 {
    if capacity > 0 {
        enrolled as f64 / capacity as f64
    } else {
        0.0
    }
}

/// `capacity - enrolled`, negative when over-enrolled, or 0 when capacity
/// is not positive.
#[must_use]
pub const fn free_seats(capacity: i64, enrolled: i64) -> i64 {
    if capacity > 0 {
        capacity.saturating_sub(enrolled)
    } else {
        0
    }
}

/// Whether an occupancy ratio reaches the critical threshold.
#[must_use]
pub fn is_critical(occupancy: f64) -> bool {
    occupancy >= CRITICAL_OCCUPANCY
}

/// Attaches derived capacity figures to a record.
#[must_use]
pub fn derive_view(record: KindergartenRecord) -> KindergartenView {
    let occupancy = occupancy(record.max_capacity, record.enrolled);
    KindergartenView {
        free_seats: free_seats(record.max_capacity, record.enrolled),
        critical: is_critical(occupancy),
        occupancy,
        record,
    }
}

/// Derives, filters, and orders records for a listing.
///
/// Both orderings are stable, so records that compare equal keep their
/// store order.
#[must_use]
pub fn list_views(
    records: Vec<KindergartenRecord>,
    params: &ListKindergartensParams,
) -> Vec<KindergartenView> {
    let mut views: Vec<KindergartenView> = records
        .into_iter()
        .filter(|r| params.kind.is_none_or(|kind| r.kind == kind))
        .map(derive_view)
        .collect();

    match params.sort {
        KindergartenSort::FreeSeats => views.sort_by(|a, b| b.free_seats.cmp(&a.free_seats)),
        KindergartenSort::Name => views.sort_by_cached_key(|v| v.record.name.to_lowercase()),
    }

    views
}

/// Derived views of every record at or above the critical threshold.
#[must_use]
pub fn critical_views(records: Vec<KindergartenRecord>) -> Vec<KindergartenView> {
    records
        .into_iter()
        .map(derive_view)
        .filter(|v| v.critical)
        .collect()
}
