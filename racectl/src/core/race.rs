use crate::core::car::Car;
use crate::core::coordinator::{Finisher, RaceCoordinator, RacePars};
use crate::core::driver::DriverKind;
use crate::core::sensor::ProximitySensor;
use crate::core::track::Track;
use crate::core::vehicle::VehicleActuation;
use crate::post::race_result::{CarEntry, RaceResult, Trajectory};
use helpers::general::{argsort, SortOrder};
use nalgebra::Point3;
use std::rc::Rc;

/// Interval at which car positions are recorded for the result (s).
const TRAJECTORY_SAMPLE_INTERVAL: f64 = 0.5;

/// Race composes the track, the cars and the coordinator of a race session and steps them in the
/// prescribed order: all cars first, the coordinator afterwards.
pub struct Race<V: VehicleActuation> {
    pub cur_racetime: f64,
    cur_step: u64,
    pub timestep_size: f64,
    pub max_race_time: f64,
    pub track: Rc<Track>,
    pub cars_list: Vec<Car<V>>,
    pub coordinator: RaceCoordinator,
    player_car_no: Option<u32>,
    trajectories: Vec<Vec<[f64; 2]>>,
    t_last_sample: Option<f64>,
}

impl<V: VehicleActuation> Race<V> {
    pub fn new(race_pars: &RacePars, track: Rc<Track>, mut cars_list: Vec<Car<V>>, timestep_size: f64) -> Race<V> {
        cars_list.sort_by_key(|car| car.p_grid);

        let ai_car_nos: Vec<u32> = cars_list
            .iter()
            .filter(|car| car.get_kind() == DriverKind::Ai)
            .map(|car| car.car_no)
            .collect();
        let player_car_no = cars_list
            .iter()
            .find(|car| car.get_kind() == DriverKind::Player)
            .map(|car| car.car_no);
        let no_cars = cars_list.len();

        Race {
            cur_racetime: 0.0,
            cur_step: 0,
            timestep_size,
            max_race_time: race_pars.max_race_time,
            track,
            cars_list,
            coordinator: RaceCoordinator::new(race_pars, &ai_car_nos),
            player_car_no,
            trajectories: vec![vec![]; no_cars],
            t_last_sample: None,
        }
    }

    /// simulate_timestep runs one physics step. Returns the finisher on the step the lap target is
    /// reached, at which point all cars are retired.
    pub fn simulate_timestep(&mut self, sensor: &dyn ProximitySensor) -> Option<Finisher> {
        // race time is derived from the step count to keep it free of accumulated rounding
        self.cur_step += 1;
        self.cur_racetime = self.cur_step as f64 * self.timestep_size;
        self.coordinator.advance_clock(self.cur_racetime);

        for car in self.cars_list.iter_mut() {
            car.fixed_update(&mut self.coordinator, sensor, self.cur_racetime);
        }

        let finisher = self.coordinator.update(self.timestep_size, &mut self.cars_list);

        if finisher.is_some() {
            for car in self.cars_list.iter_mut() {
                car.retire();
            }
        }
        finisher
    }

    /// frame_update runs the presentation tick of all cars and records their trajectories.
    pub fn frame_update(&mut self, frame_dt: f64) {
        for car in self.cars_list.iter_mut() {
            car.frame_update(self.cur_racetime, frame_dt);
        }

        let sample_due = match self.t_last_sample {
            Some(t) => self.cur_racetime >= t + TRAJECTORY_SAMPLE_INTERVAL - 1e-9,
            None => true,
        };
        if sample_due {
            for (car, trajectory) in self.cars_list.iter().zip(self.trajectories.iter_mut()) {
                let position = car.vehicle.pose().position;
                trajectory.push([position.x, position.z]);
            }
            self.t_last_sample = Some(self.cur_racetime);
        }
    }

    pub fn get_all_finished(&self) -> bool {
        self.coordinator.get_finisher().is_some() || self.cur_racetime >= self.max_race_time
    }

    pub fn get_winner(&self) -> Option<u32> {
        match self.coordinator.get_finisher()? {
            Finisher::Ai(car_no) => Some(car_no),
            Finisher::Player => self.player_car_no,
        }
    }

    /// get_laps returns the laps counted by the coordinator for the car at the given index.
    pub fn get_laps(&self, idx: usize) -> u32 {
        let car = &self.cars_list[idx];
        match car.get_kind() {
            DriverKind::Ai => self.coordinator.laps(car.car_no).unwrap_or(0),
            DriverKind::Player => self.coordinator.player_laps(),
        }
    }

    /// get_standings returns the car indices sorted by race progress, leader first.
    pub fn get_standings(&self) -> Vec<usize> {
        let race_progs: Vec<f64> = self
            .cars_list
            .iter()
            .map(|car| car.sh.get_race_prog())
            .collect();

        argsort(&race_progs, SortOrder::Descending)
    }

    pub fn car_positions(&self) -> Vec<Point3<f64>> {
        self.cars_list
            .iter()
            .map(|car| car.vehicle.pose().position)
            .collect()
    }

    pub fn get_race_result(&self) -> RaceResult {
        let respawns = |car_no: u32| {
            self.coordinator
                .tracked_cars()
                .iter()
                .find(|c| c.car_no == car_no)
                .map_or(0, |c| c.respawns)
        };

        RaceResult {
            track_name: self.track.name.to_owned(),
            lap_target: self.coordinator.get_race_pars().lap_target,
            race_time: self.cur_racetime,
            winner: self.get_winner(),
            standings: self
                .get_standings()
                .into_iter()
                .map(|idx| {
                    let car = &self.cars_list[idx];
                    CarEntry {
                        car_no: car.car_no,
                        is_player: car.get_kind() == DriverKind::Player,
                        color: car.color.to_owned(),
                        laps: self.get_laps(idx),
                        cur_waypoint: car.sh.get_cur_waypoint(),
                        race_prog: car.sh.get_race_prog(),
                        respawns: respawns(car.car_no),
                    }
                })
                .collect(),
            events: self.coordinator.events().to_vec(),
            trajectories: self
                .cars_list
                .iter()
                .zip(self.trajectories.iter())
                .map(|(car, points)| Trajectory {
                    car_no: car.car_no,
                    color: car.color.to_owned(),
                    points: points.to_owned(),
                })
                .collect(),
            waypoints: self
                .track
                .waypoints()
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::CarPars;
    use crate::core::driver::{AiDriver, PlayerDriver};
    use crate::core::sensor::{OpenRoad, SensorRig};
    use crate::core::testing::RecordingVehicle;

    fn race() -> Race<RecordingVehicle> {
        let track = Rc::new(
            Track::from_waypoints(
                "line",
                vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 200.0)],
                25.0,
            )
            .unwrap(),
        );
        let mut cars = vec![];
        for (car_no, p_grid) in [(5u32, 2u32), (9, 1)].iter() {
            let pars = CarPars {
                p_grid: *p_grid,
                ..CarPars::default()
            };
            cars.push(Car::new(
                *car_no,
                &pars,
                Rc::clone(&track),
                RecordingVehicle::at(Point3::new(0.0, 0.0, -100.0)),
                Box::new(AiDriver::new(SensorRig::default())),
            ));
        }
        cars.push(Car::new(
            0,
            &CarPars {
                p_grid: 3,
                ..CarPars::default()
            },
            Rc::clone(&track),
            RecordingVehicle::at(Point3::new(0.0, 0.0, -100.0)),
            Box::new(PlayerDriver::new()),
        ));
        Race::new(&RacePars::default(), track, cars, 0.02)
    }

    #[test]
    fn cars_are_ordered_by_grid_position() {
        let race = race();
        let car_nos: Vec<u32> = race.cars_list.iter().map(|c| c.car_no).collect();
        assert_eq!(car_nos, vec![9, 5, 0]);
        assert_eq!(race.coordinator.laps(9), Some(0));
        assert_eq!(race.coordinator.laps(0), None);
    }

    #[test]
    fn countdown_holds_the_cars() {
        let mut race = race();
        for _ in 0..149 {
            race.simulate_timestep(&OpenRoad);
        }
        assert!(!race.coordinator.is_racing());
        assert!(race.cars_list.iter().all(|c| c.vehicle.motor == [0.0; 4]));

        race.simulate_timestep(&OpenRoad);
        assert!(race.coordinator.is_racing());
        race.simulate_timestep(&OpenRoad);
        assert!(race.cars_list[0].vehicle.motor[2] > 0.0);
    }

    #[test]
    fn standings_follow_race_progress() {
        let mut race = race();
        race.cars_list[1].sh.advance();
        let standings = race.get_standings();
        assert_eq!(standings[0], 1);
        assert_eq!(race.cars_list[standings[0]].car_no, 5);
    }

    #[test]
    fn finishing_retires_all_cars() {
        let mut race = race();
        for _ in 0..3 {
            race.coordinator.lap_finished_by_player(0);
        }
        assert_eq!(race.simulate_timestep(&OpenRoad), Some(Finisher::Player));
        assert!(race.get_all_finished());
        assert_eq!(race.get_winner(), Some(0));
        assert!(race
            .cars_list
            .iter()
            .all(|c| c.status == crate::core::car::CarStatus::Retired));

        assert_eq!(race.simulate_timestep(&OpenRoad), None);
        let result = race.get_race_result();
        assert_eq!(result.standings.len(), 3);
        assert_eq!(result.winner, Some(0));
        assert_eq!(result.waypoints.len(), 2);
    }

    #[test]
    fn trajectories_are_sampled_every_half_second() {
        let mut race = race();
        for _ in 0..100 {
            race.simulate_timestep(&OpenRoad);
            race.frame_update(0.02);
        }
        let result = race.get_race_result();
        // first sample at 0.02 s, then every 0.5 s up to 2.0 s
        assert_eq!(result.trajectories[0].points.len(), 4);
    }
}
