use crate::core::vehicle::{Pose, VehicleActuation, Wheel, WheelHit};
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use std::f64::consts::PI;

/// * `wheel_radius` - (m) Radius of all wheels
/// * `wheelbase` - (m) Distance between front and rear axle
/// * `torque_gain` - Acceleration per unit of rear motor torque
/// * `brake_gain` - Deceleration per unit of brake torque
/// * `drag` - Linear drag coefficient on the forward velocity
/// * `lateral_grip` - Decay rate of the sideways velocity at full sideways stiffness
/// * `body_radius` - (m) Radius of the sphere other cars' sensors see
/// * `mass` - Mass impulses are divided by
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KinematicPars {
    pub wheel_radius: f64,
    pub wheelbase: f64,
    pub torque_gain: f64,
    pub brake_gain: f64,
    pub drag: f64,
    pub lateral_grip: f64,
    pub body_radius: f64,
    pub mass: f64,
}

impl Default for KinematicPars {
    fn default() -> Self {
        KinematicPars {
            wheel_radius: 0.35,
            wheelbase: 2.6,
            torque_gain: 0.4,
            brake_gain: 0.05,
            drag: 0.05,
            lateral_grip: 8.0,
            body_radius: 1.5,
            mass: 1.0,
        }
    }
}

/// KinematicVehicle is a bicycle-model stand-in for the host engine's wheel physics. It moves on
/// the ground plane only: vertical velocity and impulses are dropped every step.
#[derive(Debug, Clone)]
pub struct KinematicVehicle {
    pars: KinematicPars,
    pose: Pose,
    velocity: Vector3<f64>,
    center_of_mass: Vector3<f64>,
    steer: [f64; 4],
    motor: [f64; 4],
    brake: [f64; 4],
    stiffness: [(f64, f64); 4],
    rpm: [f64; 4],
}

impl KinematicVehicle {
    pub fn new(pars: &KinematicPars, pose: Pose) -> KinematicVehicle {
        KinematicVehicle {
            pars: pars.to_owned(),
            pose,
            velocity: Vector3::zeros(),
            center_of_mass: Vector3::zeros(),
            steer: [0.0; 4],
            motor: [0.0; 4],
            brake: [0.0; 4],
            stiffness: [(1.0, 1.0); 4],
            rpm: [0.0; 4],
        }
    }

    pub fn get_body_radius(&self) -> f64 {
        self.pars.body_radius
    }

    pub fn get_center_of_mass(&self) -> Vector3<f64> {
        self.center_of_mass
    }

    fn local_velocity(&self) -> Vector3<f64> {
        self.pose.inverse_transform_direction(&self.velocity)
    }

    /// integrate advances the vehicle by one physics step using the actuation set during it.
    pub fn integrate(&mut self, dt: f64) {
        let mut local = self.local_velocity();

        // drive on the rear axle, scaled by the remaining forward grip
        let rear = [Wheel::RearLeft.index(), Wheel::RearRight.index()];
        let drive: f64 = rear
            .iter()
            .map(|&i| self.motor[i] * self.stiffness[i].0)
            .sum::<f64>()
            / rear.len() as f64;
        local.z += (drive * self.pars.torque_gain - self.pars.drag * local.z) * dt;

        // brakes always act against the motion, the sign of the torque does not matter
        let brake_decel = self.brake.iter().map(|b| b.abs()).sum::<f64>() * self.pars.brake_gain * dt;
        if local.z.abs() <= brake_decel {
            local.z = 0.0;
        } else {
            local.z -= brake_decel * local.z.signum();
        }

        let sideways = rear.iter().map(|&i| self.stiffness[i].1).sum::<f64>() / rear.len() as f64;
        local.x *= (1.0 - self.pars.lateral_grip * sideways * dt).max(0.0);
        local.y = 0.0;

        // bicycle model yaw, positive steer turns right
        let front = [Wheel::FrontLeft.index(), Wheel::FrontRight.index()];
        let steer_rad = front.iter().map(|&i| self.steer[i]).sum::<f64>() / front.len() as f64 * PI / 180.0;
        let yaw_rate = local.z * steer_rad.tan() / self.pars.wheelbase;
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_rate * dt);

        self.pose.orientation = yaw * self.pose.orientation;
        self.velocity = self.pose.orientation * local;
        self.pose.position += self.velocity * dt;

        let rpm = local.z / (2.0 * PI * self.pars.wheel_radius) * 60.0;
        self.rpm = [rpm; 4];
    }
}

impl VehicleActuation for KinematicVehicle {
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

    /// Wheels are always grounded, the sideways slip is the lateral body velocity.
    fn ground_hit(&self, _: Wheel) -> Option<WheelHit> {
        let local = self.local_velocity();
        Some(WheelHit {
            point: self.pose.position,
            normal: Vector3::y(),
            forward_slip: 0.0,
            sideways_slip: local.x,
        })
    }

    fn wheel_rpm(&self, wheel: Wheel) -> f64 {
        self.rpm[wheel.index()]
    }

    fn wheel_radius(&self, _: Wheel) -> f64 {
        self.pars.wheel_radius
    }

    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
        let rpm = self.local_velocity().z / (2.0 * PI * self.pars.wheel_radius) * 60.0;
        self.rpm = [rpm; 4];
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    fn add_center_of_mass_offset(&mut self, offset: Vector3<f64>) {
        self.center_of_mass += offset;
    }

    fn add_impulse(&mut self, impulse: Vector3<f64>) {
        self.velocity += impulse / self.pars.mass;
    }
}
