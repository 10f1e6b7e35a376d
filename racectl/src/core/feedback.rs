use crate::core::vehicle::{VehicleActuation, Wheel, WheelHit};
use serde::Serialize;

/// Engine pitch when driving faster than the top speed.
const PITCH_OVER_TOP_SPEED: f64 = 1.75;
const PITCH_BASE: f64 = 0.75;
/// Forward stiffness below which a grounded wheel leaves a skid trail.
const SKID_TRAIL_STIFFNESS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightState {
    Idle,
    Brake,
    Reverse,
}

/// light_state shows the brake lights while the throttle opposes the motion or the handbrake is
/// engaged, and the reverse lights while backing up.
pub fn light_state(current_speed: f64, throttle: f64, handbrake: bool) -> LightState {
    if (current_speed > 0.0 && throttle < 0.0) || (current_speed < 0.0 && throttle > 0.0) || handbrake {
        LightState::Brake
    } else if current_speed < 0.0 && throttle < 0.0 {
        LightState::Reverse
    } else {
        LightState::Idle
    }
}

/// gear_spread is the speed range covered by a single gear.
pub fn gear_spread(top_speed: f64, number_of_gears: u32) -> f64 {
    top_speed / number_of_gears.max(1) as f64
}

/// engine_pitch rises through every forward gear and restarts at the next one. Reverse has a
/// single gear.
pub fn engine_pitch(current_speed: f64, top_speed: f64, top_speed_reverse: f64, gear_spread: f64) -> f64 {
    if current_speed > 0.0 {
        if current_speed > top_speed {
            PITCH_OVER_TOP_SPEED
        } else {
            (current_speed % gear_spread) / gear_spread + PITCH_BASE
        }
    } else {
        current_speed / top_speed_reverse + PITCH_BASE
    }
}

pub fn dust_active(current_speed: f64) -> bool {
    current_speed != 0.0
}

pub fn skid_trail_active(forward_stiffness: f64, grounded: bool) -> bool {
    forward_stiffness < SKID_TRAIL_STIFFNESS && grounded
}

/// * `skid_at` - Absolute sideways slip at which the wheel skids audibly
/// * `emissions_per_second` - Rate at which the emission delay runs down
#[derive(Debug, Clone)]
pub struct SkidSoundEmitter {
    pub skid_at: f64,
    pub emissions_per_second: f64,
    sound_delay: f64,
}

impl Default for SkidSoundEmitter {
    fn default() -> Self {
        SkidSoundEmitter {
            skid_at: 1.5,
            emissions_per_second: 10.0,
            sound_delay: 0.0,
        }
    }
}

impl SkidSoundEmitter {
    /// update returns true if a skid sound is emitted this frame.
    pub fn update(&mut self, hit: Option<&WheelHit>, frame_dt: f64) -> bool {
        let mut emitted = false;

        if let Some(hit) = hit {
            if self.skid_at <= hit.sideways_slip.abs() && self.sound_delay <= 0.0 {
                self.sound_delay = 1.0;
                emitted = true;
            }
        }

        self.sound_delay -= frame_dt * self.emissions_per_second;
        emitted
    }
}

/// Presentation signals of a car for the latest frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackState {
    pub lights: LightState,
    pub engine_pitch: f64,
    pub dust: bool,
    pub skid_trails: [bool; 4],
    pub skid_sounds: u32,
}

impl Default for FeedbackState {
    fn default() -> Self {
        FeedbackState {
            lights: LightState::Idle,
            engine_pitch: PITCH_BASE,
            dust: false,
            skid_trails: [false; 4],
            skid_sounds: 0,
        }
    }
}

/// Feedback derives the presentation signals of one car on the frame tick.
#[derive(Debug, Clone)]
pub struct Feedback {
    gear_spread: f64,
    emitters: [SkidSoundEmitter; 4],
    state: FeedbackState,
}

impl Feedback {
    pub fn new(top_speed: f64, number_of_gears: u32) -> Feedback {
        Feedback {
            gear_spread: gear_spread(top_speed, number_of_gears),
            emitters: Default::default(),
            state: FeedbackState::default(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update<V: VehicleActuation + ?Sized>(
        &mut self,
        vehicle: &V,
        current_speed: f64,
        throttle: f64,
        handbrake: bool,
        top_speed: f64,
        top_speed_reverse: f64,
        frame_dt: f64,
    ) -> &FeedbackState {
        self.state.lights = light_state(current_speed, throttle, handbrake);
        self.state.engine_pitch = engine_pitch(current_speed, top_speed, top_speed_reverse, self.gear_spread);
        self.state.dust = dust_active(current_speed);

        for wheel in Wheel::ALL.iter() {
            let hit = vehicle.ground_hit(*wheel);
            self.state.skid_trails[wheel.index()] =
                skid_trail_active(vehicle.forward_stiffness(*wheel), hit.is_some());
            if self.emitters[wheel.index()].update(hit.as_ref(), frame_dt) {
                self.state.skid_sounds += 1;
            }
        }

        &self.state
    }

    pub fn get_state(&self) -> &FeedbackState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn lights_follow_throttle_against_motion() {
        assert_eq!(light_state(20.0, -1.0, false), LightState::Brake);
        assert_eq!(light_state(-20.0, 1.0, false), LightState::Brake);
        assert_eq!(light_state(20.0, 1.0, true), LightState::Brake);
        assert_eq!(light_state(-20.0, -1.0, false), LightState::Reverse);
        assert_eq!(light_state(20.0, 0.5, false), LightState::Idle);
        assert_eq!(light_state(0.0, 0.0, false), LightState::Idle);
    }

    #[test]
    fn engine_pitch_restarts_every_gear() {
        let spread = gear_spread(150.0, 5);
        assert_relative_eq!(spread, 30.0);
        assert_relative_eq!(engine_pitch(15.0, 150.0, -50.0, spread), 1.25);
        assert_relative_eq!(engine_pitch(45.0, 150.0, -50.0, spread), 1.25);
        assert_relative_eq!(engine_pitch(160.0, 150.0, -50.0, spread), 1.75);
        assert_relative_eq!(engine_pitch(-25.0, 150.0, -50.0, spread), 1.25);
        assert_relative_eq!(engine_pitch(0.0, 150.0, -50.0, spread), 0.75);
    }

    #[test]
    fn zero_gears_fall_back_to_a_single_gear() {
        assert_relative_eq!(gear_spread(150.0, 0), 150.0);
    }

    #[test]
    fn skid_sound_is_rate_limited() {
        let hit = WheelHit {
            point: Point3::origin(),
            normal: Vector3::y(),
            forward_slip: 0.0,
            sideways_slip: -2.0,
        };
        let mut emitter = SkidSoundEmitter::default();

        // 10 emissions per second with 20 ms frames -> one sound every 5 frames
        let emitted: Vec<bool> = (0..10).map(|_| emitter.update(Some(&hit), 0.02)).collect();
        assert_eq!(emitted.iter().filter(|&&e| e).count(), 2);
        assert!(emitted[0]);
        assert!(!emitter.update(None, 0.02));
    }

    #[test]
    fn skid_trail_needs_low_grip_on_the_ground() {
        assert!(skid_trail_active(0.04, true));
        assert!(!skid_trail_active(0.04, false));
        assert!(!skid_trail_active(1.0, true));
    }
}
