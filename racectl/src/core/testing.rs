use crate::core::sensor::ProximitySensor;
use crate::core::vehicle::{Pose, VehicleActuation, Wheel, WheelHit};
use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use std::f64::consts::PI;

/// Vehicle double that stores every actuation and reports whatever the test sets.
#[derive(Debug, Clone)]
pub struct RecordingVehicle {
    pub steer: [f64; 4],
    pub motor: [f64; 4],
    pub brake: [f64; 4],
    pub stiffness: [(f64, f64); 4],
    pub rpm: f64,
    pub radius: f64,
    pub velocity: Vector3<f64>,
    pub pose: Pose,
    pub com_offset: Vector3<f64>,
    pub impulses: Vec<Vector3<f64>>,
    pub sideways_slip: f64,
    pub grounded: bool,
}

impl RecordingVehicle {
    pub fn at(position: Point3<f64>) -> RecordingVehicle {
        RecordingVehicle {
            steer: [0.0; 4],
            motor: [0.0; 4],
            brake: [0.0; 4],
            stiffness: [(1.0, 1.0); 4],
            rpm: 0.0,
            radius: 1.0,
            velocity: Vector3::zeros(),
            pose: Pose::new(position, UnitQuaternion::identity()),
            com_offset: Vector3::zeros(),
            impulses: vec![],
            sideways_slip: 0.0,
            grounded: true,
        }
    }

    /// set_current_speed sets the rear wheel rpm such that the car reports the given speed.
    pub fn set_current_speed(&mut self, speed: f64) {
        self.rpm = speed / (self.radius * PI * 0.12);
    }
}

impl VehicleActuation for RecordingVehicle {
    fn set_steer_angle(&mut self, wheel: Wheel, degrees: f64) {
        self.steer[wheel.index()] = degrees;
    }
    fn set_motor_torque(&mut self, wheel: Wheel, torque: f64) {
        self.motor[wheel.index()] = torque;
    }
    fn brake_torque(&self, wheel: Wheel) -> f64 {
        self.brake[wheel.index()]
    }
    fn set_brake_torque(&mut self, wheel: Wheel, torque: f64) {
        self.brake[wheel.index()] = torque;
    }
    fn forward_stiffness(&self, wheel: Wheel) -> f64 {
        self.stiffness[wheel.index()].0
    }
    fn set_friction_stiffness(&mut self, wheel: Wheel, forward: f64, sideways: f64) {
        self.stiffness[wheel.index()] = (forward, sideways);
    }
    fn ground_hit(&self, _: Wheel) -> Option<WheelHit> {
        if self.grounded {
            Some(WheelHit {
                point: self.pose.position,
                normal: Vector3::y(),
                forward_slip: 0.0,
                sideways_slip: self.sideways_slip,
            })
        } else {
            None
        }
    }
    fn wheel_rpm(&self, _: Wheel) -> f64 {
        self.rpm
    }
    fn wheel_radius(&self, _: Wheel) -> f64 {
        self.radius
    }
    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }
    fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }
    fn pose(&self) -> Pose {
        self.pose
    }
    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
    fn add_center_of_mass_offset(&mut self, offset: Vector3<f64>) {
        self.com_offset += offset;
    }
    fn add_impulse(&mut self, impulse: Vector3<f64>) {
        self.impulses.push(impulse);
    }
}

/// Sensor double reporting the same hit distance for every ray.
pub struct FixedHit(pub f64);

impl ProximitySensor for FixedHit {
    fn raycast(&self, _: &Point3<f64>, _: &Unit<Vector3<f64>>, max_distance: f64) -> Option<f64> {
        if self.0 <= max_distance {
            Some(self.0)
        } else {
            None
        }
    }
}
