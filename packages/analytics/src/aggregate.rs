//! Grouping of kindergarten records by municipality.

use std::collections::BTreeMap;

use preschool_kindergarten_models::{
    KindergartenRecord, MunicipalityAggregate, UNKNOWN_MUNICIPALITY,
};

use crate::derive::occupancy;

/// Running totals for one municipality.
#[derive(Debug, Default)]
struct MunicipalityAccum {
    count: u64,
    capacity: i64,
    enrolled: i64,
}

/// Groups records by municipality and sums their capacity and enrollment.
///
/// Sums saturate at the `i64` bounds instead of overflowing. Records with an empty municipality fall into the
/// [`UNKNOWN_MUNICIPALITY`] bucket. Occupancy is computed from the sums
/// (capacity-weighted), not averaged over records. The result is ordered by
/// municipality name, byte-wise ascending.
#[must_use]
pub fn aggregate_by_municipality(records: &[KindergartenRecord]) -> Vec<MunicipalityAggregate> {
    let mut by_municipality: BTreeMap<&str, MunicipalityAccum> = BTreeMap::new();

    for record in records {
        let key = if record.municipality.is_empty() {
            UNKNOWN_MUNICIPALITY
        } else {
            record.municipality.as_str()
        };
        let entry = by_municipality.entry(key).or_default();
        entry.count += 1;
        entry.capacity = entry.capacity.saturating_add(record.max_capacity);
        entry.enrolled = entry.enrolled.saturating_add(record.enrolled);
    }

    by_municipality
        .into_iter()
        .map(|(municipality, acc)| MunicipalityAggregate {
            municipality: municipality.to_string(),
            kindergarten_count: acc.count,
            total_capacity: acc.capacity,
            total_enrolled: acc.enrolled,
            occupancy: occupancy(acc.capacity, acc.enrolled),
        })
        .collect()
}
