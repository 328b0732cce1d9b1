use geo::Point;
use hashbrown::HashMap;

use crate::{
    Error, RegionId,
    loading::MapSource,
    model::{Joint, RoadPoint},
};

/// Exact location key; negative zero is folded into zero
fn location_key(point: Point<f64>) -> (u64, u64) {
    ((point.x() + 0.0).to_bits(), (point.y() + 0.0).to_bits())
}

/// Groups coincident road points of a region into joints.
///
/// Features are scanned in ascending id order, so joint ids are stable for a
/// given source.
pub fn build_joints<S: MapSource + ?Sized>(source: &S, region: RegionId) -> Result<Vec<Joint>, Error> {
    let mut feature_ids = source.feature_ids(region)?;
    feature_ids.sort_unstable();

    let mut order = Vec::new();
    let mut by_location: HashMap<(u64, u64), Vec<RoadPoint>> = HashMap::new();
    for feature_id in feature_ids {
        let road = source.load_road(region, feature_id)?;
        for (point_id, &point) in road.points().iter().enumerate() {
            let key = location_key(point);
            let points = by_location.entry(key).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            points.push(RoadPoint::new(feature_id, point_id as u32));
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|key| by_location.remove(&key))
        .filter(|points| points.len() >= 2)
        .map(Joint::new)
        .collect())
}
