use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RaceEventKind {
    Start,
    Lap,
    Respawn,
    Finish,
}

/// * `kind` - What happened
/// * `time_s` - (s) Race time of the event
/// * `lap` - Laps of the affected car at the time of the event
/// * `cars` - Affected car numbers (empty for race-wide events)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceEvent {
    pub kind: RaceEventKind,
    pub time_s: f64,
    pub lap: u32,
    pub cars: Vec<u32>,
}

/// CarEntry is a single line of the final standings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CarEntry {
    pub car_no: u32,
    pub is_player: bool,
    pub color: String,
    pub laps: u32,
    pub cur_waypoint: usize,
    pub race_prog: f64,
    pub respawns: u32,
}

/// Positions of a car sampled during the race, projected onto the ground plane [x, z].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Trajectory {
    pub car_no: u32,
    pub color: String,
    pub points: Vec<[f64; 2]>,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub track_name: String,
    pub lap_target: u32,
    pub race_time: f64,
    pub winner: Option<u32>,
    pub standings: Vec<CarEntry>,
    pub events: Vec<RaceEvent>,
    pub trajectories: Vec<Trajectory>,
    pub waypoints: Vec<[f64; 3]>,
}

impl RaceResult {
    fn format_standings(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();

        writeln!(
            &mut content,
            "RESULT: {} after {:.3}s (lap target {})",
            self.track_name, self.race_time, self.lap_target
        )?;
        match self.winner {
            Some(car_no) => writeln!(&mut content, "Winner: car {}", car_no)?,
            None => writeln!(&mut content, "Winner: none (race time limit reached)")?,
        }
        writeln!(&mut content, "pos, car, driver, laps, waypoint, progress, respawns")?;

        for (i, entry) in self.standings.iter().enumerate() {
            writeln!(
                &mut content,
                "{:3}, {:3}, {:>6}, {:4}, {:8}, {:8.3}, {:8}",
                i + 1,
                entry.car_no,
                if entry.is_player { "player" } else { "AI" },
                entry.laps,
                entry.cur_waypoint,
                entry.race_prog,
                entry.respawns
            )?;
        }

        writeln!(&mut content, "RESULT: Events")?;
        for event in self.events.iter() {
            let cars: Vec<String> = event.cars.iter().map(|c| c.to_string()).collect();
            writeln!(
                &mut content,
                "{:8.3}s, {:?}, lap {}, cars [{}]",
                event.time_s,
                event.kind,
                event.lap,
                cars.join(", ")
            )?;
        }

        Ok(content)
    }

    /// print_standings prints the final standings and the event log to the console output.
    pub fn print_standings(&self) {
        match self.format_standings() {
            Ok(content) => print!("{}", content),
            Err(e) => eprintln!("Failed to format race result: {}", e),
        }
    }

    /// write_standings_to_file writes standings and event log to a text file, by default
    /// output/last_run.txt. Returns the path to the written file.
    pub fn write_standings_to_file(&self, path: Option<&Path>) -> anyhow::Result<String> {
        let content = self
            .format_standings()
            .context("Failed to format race result!")?;

        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => Path::new("output").join("last_run.txt"),
        };
        if let Some(out_dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(out_dir).context("Failed to create output directory!")?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)
            .context(format!("Failed to open result file {}!", out_path.display()))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(out_path.to_string_lossy().into_owned())
    }

    pub fn count_events(&self, kind: RaceEventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> RaceResult {
        RaceResult {
            track_name: "oval".to_owned(),
            lap_target: 1,
            race_time: 42.5,
            winner: Some(3),
            standings: vec![CarEntry {
                car_no: 3,
                is_player: false,
                color: "#00FF00".to_owned(),
                laps: 1,
                cur_waypoint: 2,
                race_prog: 1.25,
                respawns: 0,
            }],
            events: vec![
                RaceEvent {
                    kind: RaceEventKind::Start,
                    time_s: 3.0,
                    lap: 0,
                    cars: vec![],
                },
                RaceEvent {
                    kind: RaceEventKind::Finish,
                    time_s: 42.5,
                    lap: 1,
                    cars: vec![3],
                },
            ],
            trajectories: vec![],
            waypoints: vec![],
        }
    }

    #[test]
    fn standings_list_cars_and_events() {
        let content = result().format_standings().unwrap();
        assert!(content.contains("Winner: car 3"));
        assert!(content.contains("Finish, lap 1, cars [3]"));
        assert_eq!(result().count_events(RaceEventKind::Start), 1);
    }

    #[test]
    fn standings_are_written_to_the_given_path() {
        let path = std::env::temp_dir().join("racectl_result_test.txt");
        let written = result().write_standings_to_file(Some(&path)).unwrap();
        let content = std::fs::read_to_string(&written).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(content.starts_with("RESULT: oval"));
    }
}
