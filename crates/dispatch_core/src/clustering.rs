//! Density-based clustering over load origins.
//!
//! Consumed by the isolation detector as a black box: coordinates in, one
//! label per point out. Distances are great-circle miles.

use h3o::LatLng;

use crate::geo::haversine_miles;

/// Cluster assignment for one input point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Not density-reachable from any core point.
    Noise,
    Cluster(usize),
}

/// DBSCAN over `points` with neighborhood radius `eps_miles` and minimum
/// cluster size `min_points` (the core point counts toward its own
/// neighborhood).
///
/// Degenerate input never fails: fewer points than `min_points` simply labels
/// everything [`Label::Noise`].
pub fn dbscan(points: &[LatLng], eps_miles: f64, min_points: usize) -> Vec<Label> {
    let mut labels: Vec<Option<Label>> = vec![None; points.len()];
    let mut next_cluster = 0usize;

    for i in 0..points.len() {
        if labels[i].is_some() {
            continue;
        }
        let neighbors = region_query(points, i, eps_miles);
        if neighbors.len() < min_points {
            labels[i] = Some(Label::Noise);
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[i] = Some(Label::Cluster(cluster));

        // Expand the cluster breadth-first from the seed neighborhood.
        let mut frontier = neighbors;
        while let Some(j) = frontier.pop() {
            match labels[j] {
                Some(Label::Cluster(_)) => continue,
                // Noise points become border members when reached.
                Some(Label::Noise) | None => {
                    let was_unvisited = labels[j].is_none();
                    labels[j] = Some(Label::Cluster(cluster));
                    if was_unvisited {
                        let reachable = region_query(points, j, eps_miles);
                        if reachable.len() >= min_points {
                            frontier.extend(reachable);
                        }
                    }
                }
            }
        }
    }

    labels
        .into_iter()
        .map(|label| label.unwrap_or(Label::Noise))
        .collect()
}

fn region_query(points: &[LatLng], center: usize, eps_miles: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|&(i, p)| i == center || haversine_miles(points[center], *p) <= eps_miles)
        .map(|(i, _)| i)
        .collect()
}

/// Mean coordinate of each cluster's members, indexed by cluster id.
pub fn centroids(points: &[LatLng], labels: &[Label]) -> Vec<LatLng> {
    let cluster_count = labels
        .iter()
        .filter_map(|l| match l {
            Label::Cluster(id) => Some(id + 1),
            Label::Noise => None,
        })
        .max()
        .unwrap_or(0);

    let mut sums = vec![(0.0f64, 0.0f64, 0usize); cluster_count];
    for (point, label) in points.iter().zip(labels) {
        if let Label::Cluster(id) = label {
            let (lat, lng, n) = &mut sums[*id];
            *lat += point.lat();
            *lng += point.lng();
            *n += 1;
        }
    }

    sums.into_iter()
        .filter(|(_, _, n)| *n > 0)
        .filter_map(|(lat, lng, n)| LatLng::new(lat / n as f64, lng / n as f64).ok())
        .collect()
}
