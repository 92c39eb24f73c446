//! Spatial candidate selection: equipment filter plus a bounded min-heap over
//! approximate great-circle distance.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use h3o::LatLng;

use crate::config::DispatchConfig;
use crate::ecs::{CandidateDistance, CandidateSet, Equipment, TruckId};
use crate::geo::haversine_meters;

/// Heap entry ordered so that [`BinaryHeap`] pops the nearest truck first,
/// with ties broken by ascending truck id for reproducible shortlists.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CandidateEntry {
    distance_m: f64,
    truck_id: TruckId,
}

impl Eq for CandidateEntry {}

impl Ord for CandidateEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by distance.
        other
            .distance_m
            .total_cmp(&self.distance_m)
            .then_with(|| other.truck_id.cmp(&self.truck_id))
    }
}

impl PartialOrd for CandidateEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build the shortlist for a load posting.
///
/// Trucks whose equipment does not exactly match the load's requirement are
/// never considered. The result is bounded by
/// min(`selection_pop_limit` extractions, `candidate_cap` selections); every
/// entry starts [`CandidateDistance::Pending`] until refinement resolves it.
pub fn select_candidates(
    origin: LatLng,
    required_equipment: Equipment,
    trucks: impl Iterator<Item = (TruckId, LatLng, Equipment)>,
    config: &DispatchConfig,
) -> CandidateSet {
    let mut heap = BinaryHeap::new();
    for (truck_id, position, equipment) in trucks {
        if equipment != required_equipment {
            continue;
        }
        heap.push(CandidateEntry {
            distance_m: haversine_meters(position, origin),
            truck_id,
        });
    }

    let mut shortlist = BTreeMap::new();
    for _ in 0..config.selection_pop_limit {
        if shortlist.len() >= config.candidate_cap {
            break;
        }
        let Some(entry) = heap.pop() else {
            break;
        };
        shortlist.insert(entry.truck_id, CandidateDistance::Pending);
    }
    CandidateSet(shortlist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).expect("valid coordinate")
    }

    fn origin() -> LatLng {
        point(29.9561, -90.0773)
    }

    #[test]
    fn incompatible_equipment_is_excluded_even_when_closer() {
        // Truck 1: Flatbed, ~10 miles out. Truck 2: Van, ~1 mile out.
        let trucks = vec![
            (TruckId(1), point(30.10, -90.0773), Equipment::Flatbed),
            (TruckId(2), point(29.97, -90.0773), Equipment::Van),
        ];
        let set = select_candidates(
            origin(),
            Equipment::Flatbed,
            trucks.into_iter(),
            &DispatchConfig::default(),
        );
        assert_eq!(set.0.len(), 1);
        assert!(set.0.contains_key(&TruckId(1)));
    }

    #[test]
    fn shortlist_is_capped_at_candidate_cap() {
        let trucks: Vec<_> = (0..35)
            .map(|i| {
                (
                    TruckId(i),
                    point(30.0 + f64::from(i) * 0.05, -90.0),
                    Equipment::Van,
                )
            })
            .collect();
        let set = select_candidates(
            origin(),
            Equipment::Van,
            trucks.into_iter(),
            &DispatchConfig::default(),
        );
        assert_eq!(set.0.len(), 20);
        // Nearest 20 survive: ids 0..20 are ordered by distance here.
        assert!(set.0.contains_key(&TruckId(0)));
        assert!(!set.0.contains_key(&TruckId(34)));
    }

    #[test]
    fn equal_distances_select_lowest_truck_ids_first() {
        let shared = point(30.5, -90.0);
        let trucks: Vec<_> = (0..30)
            .rev()
            .map(|i| (TruckId(i), shared, Equipment::Reefer))
            .collect();
        let set = select_candidates(
            origin(),
            Equipment::Reefer,
            trucks.into_iter(),
            &DispatchConfig::default(),
        );
        assert_eq!(set.0.len(), 20);
        for id in 0..20 {
            assert!(set.0.contains_key(&TruckId(id)), "missing truck {id}");
        }
    }

    #[test]
    fn empty_fleet_yields_empty_shortlist() {
        let set = select_candidates(
            origin(),
            Equipment::Van,
            std::iter::empty(),
            &DispatchConfig::default(),
        );
        assert!(set.0.is_empty());
    }

    #[test]
    fn pop_limit_bounds_extractions() {
        let config = DispatchConfig::default()
            .with_candidate_cap(20)
            .with_notify_cap(20);
        let config = DispatchConfig {
            selection_pop_limit: 5,
            ..config
        };
        let trucks: Vec<_> = (0..10)
            .map(|i| {
                (
                    TruckId(i),
                    point(30.0 + f64::from(i) * 0.1, -90.0),
                    Equipment::Van,
                )
            })
            .collect();
        let set = select_candidates(origin(), Equipment::Van, trucks.into_iter(), &config);
        assert_eq!(set.0.len(), 5);
    }
}
