use crate::core::sensor::{ProximitySensor, SensorRig};
use crate::core::vehicle::Pose;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// |steer input| below which the AI only makes minor corrections.
const SHARP_TURN_STEER: f64 = 0.5;
/// Body speed above which the AI slides through sharp turns on the handbrake.
const HANDBRAKE_SLIDE_SPEED: f64 = 10.0;
/// Body speed above which the player's handbrake breaks traction.
const PLAYER_POWER_SLIDE_SPEED: f64 = 1.0;
/// Vertical axis magnitude counted as a brake request.
const PLAYER_BRAKE_AXIS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    Ai,
    Player,
}

/// Rear tire grip requested by a command source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    Nominal,
    Handbrake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RearBrake {
    Released,
    /// Light braking while coasting
    Idle,
    /// Braking against the current direction of travel
    Hard,
}

/// Brake torques requested by the player. AI drivers leave the brakes untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrakeCommand {
    pub handbrake: bool,
    pub rear: RearBrake,
}

/// DriveCommand is the output of a command source for one physics step. `steer` and `throttle`
/// are factors of the car's max turn angle and max torque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub steer: f64,
    pub throttle: f64,
    pub grip: Grip,
    pub brakes: Option<BrakeCommand>,
    pub reset: bool,
}

impl Default for DriveCommand {
    fn default() -> Self {
        DriveCommand {
            steer: 0.0,
            throttle: 0.0,
            grip: Grip::Nominal,
            brakes: None,
            reset: false,
        }
    }
}

impl DriveCommand {
    pub fn handbrake_engaged(&self) -> bool {
        self.grip == Grip::Handbrake || self.brakes.map_or(false, |b| b.handbrake)
    }
}

/// Observation handed to a command source every physics step.
pub struct Observation<'a> {
    pub time: f64,
    pub pose: Pose,
    pub velocity: Vector3<f64>,
    pub local_velocity: Vector3<f64>,
    /// current waypoint in the car's local frame, projected to the car's height
    pub rel_waypoint: Vector3<f64>,
    pub current_speed: f64,
    pub sensor: &'a dyn ProximitySensor,
}

/// CommandSource turns an observation into drive commands. Cars are polymorphic over it.
pub trait CommandSource {
    fn kind(&self) -> DriverKind;
    fn decide(&mut self, obs: &Observation) -> DriveCommand;
}

// -------------------------------------------------------------------------------------------------
// AI DRIVER ---------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// steer_input returns the lateral share of the direction to the waypoint, 0 if the car sits
/// exactly on it.
pub fn steer_input(rel: &Vector3<f64>) -> f64 {
    let dist = rel.norm();
    if dist > 0.0 {
        rel.x / dist
    } else {
        0.0
    }
}

/// Outcome of the AI turn policy before sensor weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnPlan {
    pub steer_input: f64,
    pub throttle: f64,
    pub handbrake: bool,
}

/// AiDriver follows the waypoints and weights its inputs with the proximity sensor readings to
/// keep clear of traffic.
#[derive(Debug, Clone)]
pub struct AiDriver {
    rig: SensorRig,
    input_torque: f64,
    apply_handbrake: bool,
}

impl AiDriver {
    pub fn new(rig: SensorRig) -> AiDriver {
        AiDriver {
            rig,
            input_torque: 0.0,
            apply_handbrake: false,
        }
    }

    /// plan applies the turn policy. A sharp turn at speed only engages the handbrake and keeps
    /// the throttle of the previous step.
    pub fn plan(&mut self, rel: &Vector3<f64>, body_speed: f64, local_forward_velocity: f64) -> TurnPlan {
        let mut steer = steer_input(rel);
        let dist = rel.norm();

        if steer.abs() < SHARP_TURN_STEER {
            self.input_torque = if dist > 0.0 { rel.z / dist } else { 0.0 };
            self.apply_handbrake = false;
        } else if body_speed > HANDBRAKE_SLIDE_SPEED {
            self.apply_handbrake = true;
        } else if local_forward_velocity < 0.0 {
            // back up and steer out of the bad angle
            self.apply_handbrake = false;
            self.input_torque = -1.0;
            steer = -steer;
        } else {
            self.apply_handbrake = false;
            self.input_torque = 0.0;
        }

        TurnPlan {
            steer_input: steer,
            throttle: self.input_torque,
            handbrake: self.apply_handbrake,
        }
    }
}

impl CommandSource for AiDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Ai
    }

    fn decide(&mut self, obs: &Observation) -> DriveCommand {
        let plan = self.plan(
            &obs.rel_waypoint,
            obs.velocity.norm(),
            obs.local_velocity.z,
        );
        let readings = self.rig.scan(&obs.pose, obs.sensor);

        DriveCommand {
            steer: (readings.left + readings.right) * plan.steer_input,
            throttle: readings.forward * plan.throttle,
            grip: if plan.handbrake {
                Grip::Handbrake
            } else {
                Grip::Nominal
            },
            brakes: None,
            reset: false,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// PLAYER DRIVER -----------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// Raw control axes and buttons of the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerInput {
    pub vertical: f64,
    pub horizontal: f64,
    pub handbrake: bool,
    pub reset: bool,
}

/// Input held from `t_start` until the next keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct InputKeyframe {
    pub t_start: f64,
    #[serde(flatten)]
    pub input: PlayerInput,
}

/// PlayerDriver passes the raw axes through. Input is either pushed by the host via set_input or
/// replayed from a keyframe script.
#[derive(Debug, Clone, Default)]
pub struct PlayerDriver {
    input: PlayerInput,
    script: Vec<InputKeyframe>,
}

impl PlayerDriver {
    pub fn new() -> PlayerDriver {
        PlayerDriver::default()
    }

    pub fn with_script(mut script: Vec<InputKeyframe>) -> PlayerDriver {
        script.sort_by(|a, b| {
            a.t_start
                .partial_cmp(&b.t_start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        PlayerDriver {
            input: PlayerInput::default(),
            script,
        }
    }

    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    fn poll(&mut self, time: f64) {
        if let Some(keyframe) = self.script.iter().rev().find(|k| k.t_start <= time) {
            self.input = keyframe.input;
        }
    }

    /// rear_brake brakes hard when the vertical axis opposes the direction of travel and lightly
    /// when it is released, never while the handbrake is held.
    pub fn rear_brake(input: &PlayerInput, local_forward_velocity: f64) -> RearBrake {
        let v = input.vertical;
        let against_motion = (v <= -PLAYER_BRAKE_AXIS && local_forward_velocity > 0.0)
            || (v >= PLAYER_BRAKE_AXIS && local_forward_velocity < 0.0);

        if !input.handbrake && against_motion {
            RearBrake::Hard
        } else if !input.handbrake && v == 0.0 {
            RearBrake::Idle
        } else {
            RearBrake::Released
        }
    }
}

impl CommandSource for PlayerDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Player
    }

    fn decide(&mut self, obs: &Observation) -> DriveCommand {
        self.poll(obs.time);
        let input = self.input;

        // wheels lock at speed for a power slide, otherwise skid to a stop with full grip
        let grip = if input.handbrake && obs.velocity.norm() > PLAYER_POWER_SLIDE_SPEED {
            Grip::Handbrake
        } else {
            Grip::Nominal
        };

        DriveCommand {
            steer: input.horizontal,
            throttle: input.vertical,
            grip,
            brakes: Some(BrakeCommand {
                handbrake: input.handbrake,
                rear: PlayerDriver::rear_brake(&input, obs.local_velocity.z),
            }),
            reset: input.reset,
        }
    }
}
