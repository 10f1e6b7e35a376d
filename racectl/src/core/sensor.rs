use crate::core::vehicle::Pose;
use nalgebra::{Point3, Unit, Vector3};
use serde::Deserialize;

/// Clearance reported when a ray hits nothing.
pub const CLEAR: f64 = 1.0;

/// ProximitySensor is the host's ray-cast query. It returns the distance to the nearest hit along
/// `direction` or `None` if nothing is found within `max_distance`.
pub trait ProximitySensor {
    fn raycast(
        &self,
        origin: &Point3<f64>,
        direction: &Unit<Vector3<f64>>,
        max_distance: f64,
    ) -> Option<f64>;
}

/// Sensor for an empty world, every ray is clear.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRoad;

impl ProximitySensor for OpenRoad {
    fn raycast(&self, _: &Point3<f64>, _: &Unit<Vector3<f64>>, _: f64) -> Option<f64> {
        None
    }
}

/// clearance maps a raw hit distance onto [-1, 1]: 1 is unobstructed, -1 an obstacle touching
/// the ray origin.
pub fn clearance(hit_distance: Option<f64>, max_distance: f64) -> f64 {
    match hit_distance {
        Some(distance) if max_distance > 0.0 => {
            ((distance / max_distance) * 2.0 - 1.0).max(-1.0).min(CLEAR)
        }
        _ => CLEAR,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    pub forward: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for SensorReadings {
    fn default() -> Self {
        SensorReadings {
            forward: CLEAR,
            left: CLEAR,
            right: CLEAR,
        }
    }
}

/// * `braking_distance` - Range of the forward ray
/// * `forward_offset` - Offset of the forward ray origin along the car's forward axis
/// * `turning_distance` - Range of the side rays
/// * `left_offset` - Offset of the left ray origin along the car's right axis
/// * `right_offset` - Offset of the right ray origin along the car's right axis
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SensorRig {
    pub braking_distance: f64,
    pub forward_offset: f64,
    pub turning_distance: f64,
    pub left_offset: f64,
    pub right_offset: f64,
}

impl Default for SensorRig {
    fn default() -> Self {
        SensorRig {
            braking_distance: 6.0,
            forward_offset: 2.5,
            turning_distance: 6.0,
            left_offset: -1.2,
            right_offset: 1.2,
        }
    }
}

impl SensorRig {
    /// scan casts the three rays of the rig. Both side rays point along the car's right axis and
    /// only differ by their origin.
    pub fn scan(&self, pose: &Pose, sensor: &dyn ProximitySensor) -> SensorReadings {
        let forward = Unit::new_normalize(pose.forward());
        let right = Unit::new_normalize(pose.right());

        let car_front = pose.position + forward.into_inner() * self.forward_offset;
        let car_left = pose.position + right.into_inner() * self.left_offset;
        let car_right = pose.position + right.into_inner() * self.right_offset;

        SensorReadings {
            forward: clearance(
                sensor.raycast(&car_front, &forward, self.braking_distance),
                self.braking_distance,
            ),
            left: clearance(
                sensor.raycast(&car_left, &right, self.turning_distance),
                self.turning_distance,
            ),
            right: clearance(
                sensor.raycast(&car_right, &right, self.turning_distance),
                self.turning_distance,
            ),
        }
    }
}
