use crate::core::coordinator::CountdownDisplay;
use crate::core::feedback::LightState;
use crate::post::race_result::RaceResult;

pub const MAX_SNAPSHOT_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone)]
pub struct CarSnapshot {
    pub car_no: u32,
    pub is_player: bool,
    pub color: RgbColor,
    pub position: [f64; 3],
    pub race_prog: f64,
    pub current_speed: f64,
    pub lights: LightState,
}

#[derive(Debug, Clone, Default)]
pub struct RaceSnapshot {
    pub race_time: f64,
    pub is_racing: bool,
    pub countdown: Option<CountdownDisplay>,
    pub car_snapshots: Vec<CarSnapshot>,

    // sent once when the race is over
    pub final_result: Option<RaceResult>,
}
