use crate::core::car::CarPars;
use crate::core::coordinator::RacePars;
use crate::core::driver::InputKeyframe;
use crate::core::track::TrackPars;
use crate::interfaces::kinematic::KinematicPars;
use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

/// * `car_no` - Car driven by the player, must be contained in `car_pars_all`
/// * `script` - Input keyframes replayed during the race
#[derive(Debug, Deserialize, Clone)]
pub struct PlayerPars {
    pub car_no: u32,
    #[serde(default)]
    pub script: Vec<InputKeyframe>,
}

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    #[serde(default)]
    pub race_pars: RacePars,
    pub track_pars: TrackPars,
    pub car_pars_all: HashMap<u32, CarPars>,
    /// AI cars taking part in the race
    pub participants: Vec<u32>,
    #[serde(default)]
    pub player: Option<PlayerPars>,
    #[serde(default)]
    pub host_pars: KinematicPars,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// check_timestep_size makes sure the timestep size is in the range [0.001, 1.0].
pub fn check_timestep_size(timestep_size: f64) -> Result<(), InputValueError> {
    if !(0.001..=1.0).contains(&timestep_size) {
        return Err(InputValueError::new(format!(
            "timestep size must be in the range [0.001, 1.0], but is {}",
            timestep_size
        )));
    }
    Ok(())
}

impl SimPars {
    /// validate checks the parameters that cannot be expressed by the file format alone.
    pub fn validate(&self) -> Result<(), InputValueError> {
        if self.race_pars.lap_target < 1 {
            return Err(InputValueError::new("lap target must be at least 1"));
        }
        if !(self.race_pars.respawn_delay > 0.0) {
            return Err(InputValueError::new(format!(
                "respawn delay must be positive, but is {}",
                self.race_pars.respawn_delay
            )));
        }
        let host = &self.host_pars;
        for (name, value) in [
            ("wheel_radius", host.wheel_radius),
            ("wheelbase", host.wheelbase),
            ("mass", host.mass),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(InputValueError::new(format!(
                    "host parameter {} must be positive, but is {}",
                    name, value
                )));
            }
        }
        if self.participants.is_empty() && self.player.is_none() {
            return Err(InputValueError::new("a race needs at least one car"));
        }

        let mut car_nos: Vec<u32> = self.participants.to_owned();
        if let Some(player) = &self.player {
            car_nos.push(player.car_no);
        }
        for car_no in car_nos.iter() {
            if !self.car_pars_all.contains_key(car_no) {
                return Err(InputValueError::new(format!(
                    "car {} takes part but has no entry in car_pars_all",
                    car_no
                )));
            }
        }

        let mut unique = car_nos.to_owned();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != car_nos.len() {
            return Err(InputValueError::new("every car may only take part once"));
        }

        Ok(())
    }
}
