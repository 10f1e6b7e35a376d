use crate::core::vehicle::{look_rotation, Pose};
use crate::post::race_result::{RaceEvent, RaceEventKind};
use nalgebra::Point3;
use serde::Deserialize;
use tracing::{debug, info};

/// * `countdown_delay` - Countdown before the race starts (s)
/// * `respawn_delay` - Time a car may go without progress before it is respawned (s)
/// * `distance_to_cover` - Distance a car has to close on its waypoint to count as progressing
/// * `lap_target` - Number of laps after which the race is finished
/// * `max_race_time` - Time after which the simulation is stopped if nobody finished (s)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RacePars {
    pub countdown_delay: u32,
    pub respawn_delay: f64,
    pub distance_to_cover: f64,
    pub lap_target: u32,
    pub max_race_time: f64,
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            countdown_delay: 3,
            respawn_delay: 5.0,
            distance_to_cover: 1.0,
            lap_target: 3,
            max_race_time: 600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Countdown(i64),
    Racing,
    Finished,
}

/// Image shown while counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownDisplay {
    Digit(u8),
    Go,
}

/// Car that reached the lap target first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finisher {
    Ai(u32),
    Player,
}

/// Contestant is the view the coordinator has on a car it watches.
pub trait Contestant {
    fn get_car_no(&self) -> u32;
    fn get_pose(&self) -> Pose;
    /// index of the waypoint the car is heading for, identifies the waypoint reference
    fn get_current_waypoint(&self) -> usize;
    fn get_current_waypoint_position(&self) -> Point3<f64>;
    fn get_last_waypoint_position(&self) -> Point3<f64>;
    /// respawn stops the car and puts it down at the given pose.
    fn respawn(&mut self, pose: Pose);
}

/// Progress bookkeeping of a watched AI car.
#[derive(Debug, Clone)]
pub struct TrackedCar {
    pub car_no: u32,
    pub laps: u32,
    pub respawns: u32,
    respawn_time: f64,
    distance_left: f64,
    waypoint: Option<usize>,
}

impl TrackedCar {
    fn new(car_no: u32, respawn_delay: f64) -> TrackedCar {
        TrackedCar {
            car_no,
            laps: 0,
            respawns: 0,
            respawn_time: respawn_delay,
            distance_left: f64::MAX,
            waypoint: None,
        }
    }

    pub fn get_respawn_time(&self) -> f64 {
        self.respawn_time
    }

    pub fn get_distance_left(&self) -> f64 {
        self.distance_left
    }
}

/// RaceCoordinator owns the race-wide state: countdown, lap counts of the AI cars and the player,
/// and the stall watchdog of every AI car. It is handed to the cars every physics step instead of
/// being reachable globally.
#[derive(Debug, Clone)]
pub struct RaceCoordinator {
    pars: RacePars,
    cur_time: f64,
    countdown_start: f64,
    race_started: bool,
    finished: Option<Finisher>,
    tracked: Vec<TrackedCar>,
    player_laps: u32,
    events: Vec<RaceEvent>,
}

impl RaceCoordinator {
    /// new creates the coordinator for the given AI cars and starts the countdown at time 0.
    pub fn new(race_pars: &RacePars, ai_car_nos: &[u32]) -> RaceCoordinator {
        RaceCoordinator {
            pars: race_pars.to_owned(),
            cur_time: 0.0,
            countdown_start: 0.0,
            race_started: false,
            finished: None,
            tracked: ai_car_nos
                .iter()
                .map(|&car_no| TrackedCar::new(car_no, race_pars.respawn_delay))
                .collect(),
            player_laps: 0,
            events: vec![],
        }
    }

    /// advance_clock sets the race time of the current step. It must be called before the cars
    /// are updated such that lap notifications carry the right time stamp.
    pub fn advance_clock(&mut self, t_now: f64) {
        self.cur_time = t_now;
    }

    pub fn get_race_pars(&self) -> &RacePars {
        &self.pars
    }

    /// countdown_seconds_remaining returns the configured delay minus the elapsed whole seconds
    /// since the countdown started. Becomes negative after the start.
    pub fn countdown_seconds_remaining(&self) -> i64 {
        let elapsed = (self.cur_time - self.countdown_start).floor() as i64;
        self.pars.countdown_delay as i64 - elapsed
    }

    pub fn countdown_display(&self) -> Option<CountdownDisplay> {
        match self.countdown_seconds_remaining() {
            s @ 1..=3 => Some(CountdownDisplay::Digit(s as u8)),
            0 => Some(CountdownDisplay::Go),
            _ => None,
        }
    }

    pub fn is_racing(&self) -> bool {
        self.race_started
    }

    pub fn phase(&self) -> RacePhase {
        if self.finished.is_some() {
            RacePhase::Finished
        } else if self.race_started {
            RacePhase::Racing
        } else {
            RacePhase::Countdown(self.countdown_seconds_remaining())
        }
    }

    pub fn get_finisher(&self) -> Option<Finisher> {
        self.finished
    }

    /// lap_finished_by_ai counts a lap for the AI car with the given number. Unknown cars are
    /// ignored.
    pub fn lap_finished_by_ai(&mut self, car_no: u32) {
        let cur_time = self.cur_time;
        match self.tracked.iter_mut().find(|c| c.car_no == car_no) {
            Some(tracked) => {
                tracked.laps += 1;
                info!(car_no, lap = tracked.laps, t = cur_time, "AI car completed a lap");
                self.events.push(RaceEvent {
                    kind: RaceEventKind::Lap,
                    time_s: cur_time,
                    lap: tracked.laps,
                    cars: vec![car_no],
                });
            }
            None => debug!(car_no, "Ignored lap notification of an unknown car"),
        }
    }

    pub fn lap_finished_by_player(&mut self, car_no: u32) {
        self.player_laps += 1;
        info!(car_no, lap = self.player_laps, t = self.cur_time, "Player completed a lap");
        self.events.push(RaceEvent {
            kind: RaceEventKind::Lap,
            time_s: self.cur_time,
            lap: self.player_laps,
            cars: vec![car_no],
        });
    }

    /// laps returns the lap count of a tracked AI car.
    pub fn laps(&self, car_no: u32) -> Option<u32> {
        self.tracked
            .iter()
            .find(|c| c.car_no == car_no)
            .map(|c| c.laps)
    }

    pub fn player_laps(&self) -> u32 {
        self.player_laps
    }

    pub fn tracked_cars(&self) -> &[TrackedCar] {
        &self.tracked
    }

    pub fn events(&self) -> &[RaceEvent] {
        &self.events
    }

    /// update runs once per physics step after all cars were updated. It starts the race once the
    /// countdown ran out, respawns stalled AI cars and checks the lap target. Returns the finisher
    /// on the step the race is finished and None on every other step.
    pub fn update<C: Contestant>(&mut self, dt: f64, cars: &mut [C]) -> Option<Finisher> {
        self.start_race();

        if self.finished.is_none() && self.race_started {
            for car in cars.iter_mut() {
                self.watch_progress(dt, car);
            }
        }

        self.check_finish()
    }

    fn start_race(&mut self) {
        if !self.race_started && self.countdown_seconds_remaining() <= 0 {
            self.race_started = true;
            info!(t = self.cur_time, "Race started");
            self.events.push(RaceEvent {
                kind: RaceEventKind::Start,
                time_s: self.cur_time,
                lap: 0,
                cars: vec![],
            });
        }
    }

    fn watch_progress<C: Contestant>(&mut self, dt: f64, car: &mut C) {
        let car_no = car.get_car_no();
        let respawn_delay = self.pars.respawn_delay;
        let distance_to_cover = self.pars.distance_to_cover;

        let tracked = match self.tracked.iter_mut().find(|c| c.car_no == car_no) {
            Some(tracked) => tracked,
            None => return,
        };

        let next_waypoint = car.get_current_waypoint();
        let next_position = car.get_current_waypoint_position();
        let distance_covered = (next_position - car.get_pose().position).norm();

        if tracked.distance_left - distance_to_cover > distance_covered
            || tracked.waypoint != Some(next_waypoint)
        {
            tracked.waypoint = Some(next_waypoint);
            tracked.respawn_time = respawn_delay;
            tracked.distance_left = distance_covered;
        } else {
            tracked.respawn_time -= dt;
        }

        if tracked.respawn_time <= 0.0 {
            tracked.respawn_time = respawn_delay;
            tracked.distance_left = f64::MAX;
            tracked.respawns += 1;

            let last_position = car.get_last_waypoint_position();
            let orientation = look_rotation(&(next_position - last_position))
                .unwrap_or_else(|| car.get_pose().orientation);
            car.respawn(Pose::new(last_position, orientation));

            info!(car_no, t = self.cur_time, "Respawned stalled car at its last waypoint");
            self.events.push(RaceEvent {
                kind: RaceEventKind::Respawn,
                time_s: self.cur_time,
                lap: tracked.laps,
                cars: vec![car_no],
            });
        }
    }

    fn check_finish(&mut self) -> Option<Finisher> {
        if self.finished.is_some() {
            return None;
        }

        let lap_target = self.pars.lap_target;
        let finisher = if let Some(tracked) = self.tracked.iter().find(|c| c.laps >= lap_target) {
            Finisher::Ai(tracked.car_no)
        } else if self.player_laps >= lap_target {
            Finisher::Player
        } else {
            return None;
        };

        self.finished = Some(finisher);
        info!(?finisher, t = self.cur_time, "Race finished");
        self.events.push(RaceEvent {
            kind: RaceEventKind::Finish,
            time_s: self.cur_time,
            lap: lap_target,
            cars: match finisher {
                Finisher::Ai(car_no) => vec![car_no],
                Finisher::Player => vec![],
            },
        });
        Some(finisher)
    }
}
