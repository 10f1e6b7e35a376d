use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::RearLeft,
        Wheel::RearRight,
    ];
    pub const FRONT: [Wheel; 2] = [Wheel::FrontLeft, Wheel::FrontRight];
    pub const REAR: [Wheel; 2] = [Wheel::RearLeft, Wheel::RearRight];

    pub fn index(self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::FrontRight => 1,
            Wheel::RearLeft => 2,
            Wheel::RearRight => 3,
        }
    }
}

/// Contact information of a grounded wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelHit {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
    pub forward_slip: f64,
    pub sideways_slip: f64,
}

/// World-space pose of a car body. Local frame: +z forward, +x right, +y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Pose {
        Pose {
            position,
            orientation,
        }
    }

    /// Pose at `position` facing `target`. Keeps the identity orientation if the direction is
    /// degenerate.
    pub fn looking_at(position: Point3<f64>, target: &Point3<f64>) -> Pose {
        let orientation = look_rotation(&(target - position)).unwrap_or_else(UnitQuaternion::identity);
        Pose::new(position, orientation)
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * Vector3::z()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.orientation * Vector3::x()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.orientation * Vector3::y()
    }

    /// Expresses a world-space point in the local frame of the pose.
    pub fn inverse_transform_point(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.orientation
            .inverse_transform_vector(&(point - self.position))
    }

    /// Expresses a world-space direction in the local frame of the pose.
    pub fn inverse_transform_direction(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.orientation.inverse_transform_vector(direction)
    }
}

/// Rotation mapping the local +z axis onto `direction` with +y kept up. `None` for a zero-length
/// direction or one parallel to the up axis.
pub fn look_rotation(direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    if direction.norm() <= f64::EPSILON || direction.cross(&Vector3::y()).norm() <= f64::EPSILON {
        return None;
    }
    Some(UnitQuaternion::face_towards(direction, &Vector3::y()))
}

/// Rotates `current` towards `target` by at most `max_radians`, keeping the length of `current`.
pub fn rotate_towards(current: &Vector3<f64>, target: &Vector3<f64>, max_radians: f64) -> Vector3<f64> {
    let cur_norm = current.norm();
    if cur_norm <= f64::EPSILON || target.norm() <= f64::EPSILON {
        return *current;
    }

    let angle = current.angle(target);
    if angle <= max_radians {
        return target.normalize() * cur_norm;
    }

    match UnitQuaternion::rotation_between(current, target) {
        Some(rotation) => {
            let partial = UnitQuaternion::from_scaled_axis(rotation.scaled_axis() * (max_radians / angle));
            partial * current
        }
        // opposite directions, no unique rotation axis
        None => *current,
    }
}

/// VehicleActuation is the black-box wheel and rigid-body service of the host engine. Steer
/// angles are in degrees, torques in the engine's units.
pub trait VehicleActuation {
    fn set_steer_angle(&mut self, wheel: Wheel, degrees: f64);
    fn set_motor_torque(&mut self, wheel: Wheel, torque: f64);
    fn brake_torque(&self, wheel: Wheel) -> f64;
    fn set_brake_torque(&mut self, wheel: Wheel, torque: f64);
    fn forward_stiffness(&self, wheel: Wheel) -> f64;
    fn set_friction_stiffness(&mut self, wheel: Wheel, forward: f64, sideways: f64);
    fn ground_hit(&self, wheel: Wheel) -> Option<WheelHit>;
    fn wheel_rpm(&self, wheel: Wheel) -> f64;
    fn wheel_radius(&self, wheel: Wheel) -> f64;

    fn velocity(&self) -> Vector3<f64>;
    fn set_velocity(&mut self, velocity: Vector3<f64>);
    fn pose(&self) -> Pose;
    fn set_pose(&mut self, pose: Pose);
    fn add_center_of_mass_offset(&mut self, offset: Vector3<f64>);
    fn add_impulse(&mut self, impulse: Vector3<f64>);
}

/// Signed car speed derived from the rear-left wheel, roughly km/h for metre-sized wheels.
pub fn wheel_speed<V: VehicleActuation + ?Sized>(vehicle: &V) -> f64 {
    vehicle.wheel_radius(Wheel::RearLeft) * vehicle.wheel_rpm(Wheel::RearLeft) * PI * 0.12
}
