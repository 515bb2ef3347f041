use rank_core::{CapacityClass, Vehicle, VehicleId};

/// `per_class` vehicles for each class.  Ids encode the class:
/// 401, 402, … are 4-seaters; 501, … are 5-seaters.
pub fn build_fleet(classes: impl IntoIterator<Item = CapacityClass>, per_class: usize) -> Vec<Vehicle> {
    classes
        .into_iter()
        .flat_map(|class| {
            (1..=per_class as i64).map(move |n| Vehicle::new(VehicleId(i64::from(class.seats()) * 100 + n), class))
        })
        .collect()
}
