use crate::core::car::Car;
use crate::core::coordinator::Finisher;
use crate::core::driver::{AiDriver, CommandSource, DriverKind, PlayerDriver};
use crate::core::race::Race;
use crate::core::track::Track;
use crate::core::vehicle::{look_rotation, Pose, VehicleActuation};
use crate::interfaces::kinematic::KinematicVehicle;
use crate::interfaces::obstacles::ObstacleField;
use crate::interfaces::telemetry::{CarSnapshot, RaceSnapshot, RgbColor, MAX_SNAPSHOT_FREQUENCY};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::{check_timestep_size, SimPars};
use anyhow::Context;
use flume::Sender;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::rc::Rc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Distance of the first grid slot behind waypoint 0.
const D_FIRST_GRIDPOS: f64 = 10.0;
/// Distance between two consecutive grid slots.
const D_PER_GRIDPOS: f64 = 8.0;
/// Lateral offset of the grid slots from the racing line.
const GRID_LATERAL_OFFSET: f64 = 2.5;

/// grid_pose returns the starting pose for a grid position: behind waypoint 0 on the line towards
/// waypoint 1, staggered left and right, facing waypoint 1.
pub fn grid_pose(track: &Track, p_grid: u32) -> Pose {
    let start = track.waypoint(0);
    let dir = track.waypoint(1) - start;
    let orientation = look_rotation(&Vector3::new(dir.x, 0.0, dir.z)).unwrap_or_else(UnitQuaternion::identity);

    let forward = orientation * Vector3::z();
    let right = orientation * Vector3::x();
    let slot = p_grid.max(1) - 1;
    let lateral = if slot % 2 == 0 {
        -GRID_LATERAL_OFFSET
    } else {
        GRID_LATERAL_OFFSET
    };

    let position: Point3<f64> =
        start - forward * (D_FIRST_GRIDPOS + D_PER_GRIDPOS * slot as f64) + right * lateral;
    Pose::new(position, orientation)
}

/// build_race creates the race on the kinematic reference host from the inserted parameters.
pub fn build_race(sim_pars: &SimPars, timestep_size: f64) -> anyhow::Result<Race<KinematicVehicle>> {
    check_timestep_size(timestep_size).context("Invalid simulation options!")?;
    sim_pars.validate().context("Invalid simulation parameters!")?;

    let track = Rc::new(Track::new(&sim_pars.track_pars)?);
    let mut cars_list = Vec::with_capacity(sim_pars.participants.len() + 1);

    let mut entries: Vec<(u32, Box<dyn CommandSource>)> = sim_pars
        .participants
        .iter()
        .map(|&car_no| {
            let rig = sim_pars.car_pars_all[&car_no].sensor_rig;
            (car_no, Box::new(AiDriver::new(rig)) as Box<dyn CommandSource>)
        })
        .collect();
    if let Some(player) = &sim_pars.player {
        entries.push((
            player.car_no,
            Box::new(PlayerDriver::with_script(player.script.to_owned())),
        ));
    }

    for (car_no, driver) in entries {
        let car_pars = &sim_pars.car_pars_all[&car_no];
        let vehicle = KinematicVehicle::new(&sim_pars.host_pars, grid_pose(&track, car_pars.p_grid));
        cars_list.push(Car::new(car_no, car_pars, Rc::clone(&track), vehicle, driver));
    }

    info!(
        track = %track.name,
        no_waypoints = track.len(),
        track_length = track.polygon_length(),
        no_cars = cars_list.len(),
        "Race created"
    );

    Ok(Race::new(&sim_pars.race_pars, track, cars_list, timestep_size))
}

/// step_kinematic_race runs one physics step on the reference host: the cars see each other as
/// spheres, the controllers and coordinator run, then the vehicles are integrated and the frame
/// tick follows.
pub fn step_kinematic_race(race: &mut Race<KinematicVehicle>) -> Option<Finisher> {
    let body_radius = race
        .cars_list
        .first()
        .map_or(0.0, |car| car.vehicle.get_body_radius());
    let obstacles = ObstacleField::from_positions(race.car_positions().iter(), body_radius);

    let finisher = race.simulate_timestep(&obstacles);

    let timestep_size = race.timestep_size;
    for car in race.cars_list.iter_mut() {
        car.vehicle.integrate(timestep_size);
    }
    race.frame_update(timestep_size);

    finisher
}

fn create_snapshot(race: &Race<KinematicVehicle>) -> anyhow::Result<RaceSnapshot> {
    let mut snapshot = RaceSnapshot {
        race_time: race.cur_racetime,
        is_racing: race.coordinator.is_racing(),
        countdown: race.coordinator.countdown_display(),
        car_snapshots: Vec::with_capacity(race.cars_list.len()),
        final_result: None,
    };

    for car in race.cars_list.iter() {
        let tmp_color = car
            .color
            .parse::<css_color_parser::Color>()
            .context(format!("Could not parse color {} of car {}!", car.color, car.car_no))?;
        let position = car.vehicle.pose().position;

        snapshot.car_snapshots.push(CarSnapshot {
            car_no: car.car_no,
            is_player: car.get_kind() == DriverKind::Player,
            color: RgbColor {
                r: tmp_color.r,
                g: tmp_color.g,
                b: tmp_color.b,
            },
            position: [position.x, position.y, position.z],
            race_prog: car.sh.get_race_prog(),
            current_speed: car.get_current_speed(),
            lights: car.get_feedback().lights,
        });
    }

    Ok(snapshot)
}

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted the race runs in real-time and
/// snapshots are streamed at a limited frequency.
pub fn handle_race(
    sim_pars: &SimPars,
    timestep_size: f64,
    tx: Option<&Sender<RaceSnapshot>>,
    realtime_factor: f64,
) -> anyhow::Result<RaceResult> {
    if tx.is_some() && !(realtime_factor > 0.0) {
        anyhow::bail!("Real-time factor must be positive, but is {}!", realtime_factor);
    }
    let mut race = build_race(sim_pars, timestep_size)?;

    let mut t_race_update_print = 0.0;
    let mut t_race_update_stream = f64::NEG_INFINITY;

    while !race.get_all_finished() {
        let t_start = Instant::now();

        if let Some(finisher) = step_kinematic_race(&mut race) {
            info!(?finisher, t = race.cur_racetime, "Lap target reached");
        }

        if race.cur_racetime > t_race_update_print + 0.9999 {
            let leader = race.get_standings()[0];
            debug!(
                t = race.cur_racetime,
                leader = race.cars_list[leader].car_no,
                prog = race.cars_list[leader].sh.get_race_prog(),
                "Simulating..."
            );
            t_race_update_print = race.cur_racetime;
        }

        if let Some(tx) = tx {
            if race.cur_racetime > t_race_update_stream + 1.0 / MAX_SNAPSHOT_FREQUENCY - 0.001 {
                tx.send(create_snapshot(&race)?)
                    .context("Failed to send race snapshot!")?;
                t_race_update_stream = race.cur_racetime;
            }

            // sleep until time step is finished in real-time as well
            let t_step = Duration::from_secs_f64(race.timestep_size / realtime_factor);
            match t_step.checked_sub(t_start.elapsed()) {
                Some(t_sleep) => sleep(t_sleep),
                None => warn!(t = race.cur_racetime, "Could not keep up with real-time!"),
            }
        }
    }

    if race.get_winner().is_none() {
        warn!(t = race.cur_racetime, "Race time limit reached without a finisher");
    }

    let result = race.get_race_result();

    if let Some(tx) = tx {
        let mut final_msg = create_snapshot(&race)?;
        final_msg.final_result = Some(result.to_owned());
        tx.send(final_msg)
            .context("Failed to send final race result!")?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_slots_are_staggered_behind_the_start() {
        let track = Track::from_waypoints(
            "line",
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(100.0, 0.0, 0.0)],
            25.0,
        )
        .unwrap();

        let first = grid_pose(&track, 1);
        assert_relative_eq!(first.position, Point3::new(-10.0, 0.0, 2.5), epsilon = 1e-9);
        assert_relative_eq!(first.forward(), Vector3::x(), epsilon = 1e-12);

        let second = grid_pose(&track, 2);
        assert_relative_eq!(second.position, Point3::new(-18.0, 0.0, -2.5), epsilon = 1e-9);
    }

    #[test]
    fn built_cars_carry_their_center_of_mass_offset() {
        let sim_pars: SimPars = serde_json::from_str(
            r##"{
                "track_pars": {"name": "line", "waypoints": [[0, 0, 0], [100, 0, 0]]},
                "car_pars_all": {"3": {"p_grid": 2}, "5": {"p_grid": 1}},
                "participants": [3],
                "player": {"car_no": 5}
            }"##,
        )
        .unwrap();
        let race = build_race(&sim_pars, 0.02).unwrap();

        // sorted by grid position
        assert_eq!(race.cars_list[0].car_no, 5);
        assert_eq!(race.cars_list[0].get_kind(), DriverKind::Player);
        assert_relative_eq!(
            race.cars_list[1].vehicle.get_center_of_mass(),
            Vector3::new(0.0, -0.9, 0.0),
            epsilon = 1e-12
        );
        assert!(build_race(&sim_pars, 0.0).is_err());
    }

    #[test]
    fn single_waypoint_track_faces_along_z() {
        let track = Track::from_waypoints("dot", vec![Point3::new(5.0, 0.0, 5.0)], 25.0).unwrap();
        let pose = grid_pose(&track, 1);
        assert_relative_eq!(pose.position, Point3::new(2.5, 0.0, -5.0), epsilon = 1e-9);
    }
}
