use crate::core::coordinator::{Contestant, RaceCoordinator};
use crate::core::driver::{BrakeCommand, CommandSource, DriveCommand, DriverKind, Grip, Observation, RearBrake};
use crate::core::feedback::{Feedback, FeedbackState};
use crate::core::scheduler::{Scheduler, TaskId};
use crate::core::sensor::{ProximitySensor, SensorRig};
use crate::core::state_handler::{StateHandler, WaypointAdvance};
use crate::core::track::Track;
use crate::core::vehicle::{look_rotation, rotate_towards, wheel_speed, Pose, VehicleActuation, Wheel};
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::rc::Rc;
use tracing::{debug, info};

/// Speed below which an AI car schedules a flip.
const FLIP_SCHEDULE_SPEED: f64 = -40.0;
/// Speed below which a due flip is carried out.
const FLIP_EXECUTE_SPEED: f64 = -50.0;
const FLIP_DELAY: f64 = 5.0;

/// Per-car tuning.
/// * `color` - Car color used for telemetry and plots (hex)
/// * `p_grid` - Grid position (1 = front)
/// * `max_turn_angle` - (deg) Steer angle at full steering input
/// * `max_torque` - Motor torque at full throttle
/// * `max_brake_torque` - Handbrake torque
/// * `deceleration_torque` - Engine brake torque when coasting
/// * `top_speed` - Speed above which the motor is cut
/// * `top_speed_reverse` - Speed below which the motor is cut when reversing (negative)
/// * `handbrake_forward_slip` - Rear forward stiffness while sliding on the handbrake
/// * `handbrake_sideways_slip` - Rear sideways stiffness while sliding on the handbrake
/// * `spoiler_ratio` - Downforce impulse per unit of forward velocity
/// * `center_of_mass_adjustment` - Offset added to the centre of mass on creation
/// * `number_of_gears` - Gears the top speed is spread over (engine sound)
/// * `sensor_rig` - Proximity sensor geometry of AI cars
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CarPars {
    pub color: String,
    pub p_grid: u32,
    pub max_turn_angle: f64,
    pub max_torque: f64,
    pub max_brake_torque: f64,
    pub deceleration_torque: f64,
    pub top_speed: f64,
    pub top_speed_reverse: f64,
    pub handbrake_forward_slip: f64,
    pub handbrake_sideways_slip: f64,
    pub spoiler_ratio: f64,
    pub center_of_mass_adjustment: [f64; 3],
    pub number_of_gears: u32,
    pub sensor_rig: SensorRig,
}

impl Default for CarPars {
    fn default() -> Self {
        CarPars {
            color: "#FF0000".to_owned(),
            p_grid: 1,
            max_turn_angle: 10.0,
            max_torque: 10.0,
            max_brake_torque: 100.0,
            deceleration_torque: 30.0,
            top_speed: 150.0,
            top_speed_reverse: -50.0,
            handbrake_forward_slip: 0.04,
            handbrake_sideways_slip: 0.08,
            spoiler_ratio: 0.1,
            center_of_mass_adjustment: [0.0, -0.9, 0.0],
            number_of_gears: 5,
            sensor_rig: SensorRig::default(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CarStatus {
    Running,
    Retired,
}

/// Deferred reorientation of an AI car driving backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flip;

/// Car is the single car controller for AI and player cars. What differs between both is the
/// command source, everything else (actuation, waypoint progress, feedback) is shared.
pub struct Car<V: VehicleActuation> {
    pub car_no: u32,
    pub color: String,
    pub p_grid: u32,
    pub status: CarStatus,
    pars: CarPars,
    track: Rc<Track>,
    pub vehicle: V,
    driver: Box<dyn CommandSource>,
    pub sh: StateHandler,
    current_speed: f64,
    last_cmd: DriveCommand,
    flips: Scheduler<Flip>,
    pending_flip: Option<TaskId>,
    feedback: Feedback,
}

impl<V: VehicleActuation> Car<V> {
    pub fn new(
        car_no: u32,
        car_pars: &CarPars,
        track: Rc<Track>,
        mut vehicle: V,
        driver: Box<dyn CommandSource>,
    ) -> Car<V> {
        let com = car_pars.center_of_mass_adjustment;
        vehicle.add_center_of_mass_offset(Vector3::new(com[0], com[1], com[2]));

        Car {
            car_no,
            color: car_pars.color.to_owned(),
            p_grid: car_pars.p_grid,
            status: CarStatus::Running,
            pars: car_pars.to_owned(),
            sh: StateHandler::new(track.len(), 0),
            track,
            vehicle,
            driver,
            current_speed: 0.0,
            last_cmd: DriveCommand::default(),
            flips: Scheduler::new(),
            pending_flip: None,
            feedback: Feedback::new(car_pars.top_speed, car_pars.number_of_gears),
        }
    }

    pub fn get_kind(&self) -> DriverKind {
        self.driver.kind()
    }

    pub fn get_current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn get_last_command(&self) -> &DriveCommand {
        &self.last_cmd
    }

    pub fn get_feedback(&self) -> &FeedbackState {
        self.feedback.get_state()
    }

    pub fn has_pending_flip(&self) -> bool {
        self.pending_flip
            .map_or(false, |id| self.flips.is_pending(id))
    }

    /// fixed_update runs the controller for one physics step. Nothing happens before the race has
    /// started or after the car was retired.
    pub fn fixed_update(&mut self, coordinator: &mut RaceCoordinator, sensor: &dyn ProximitySensor, t_now: f64) {
        if !coordinator.is_racing() || self.status == CarStatus::Retired {
            return;
        }
        self.sh.begin_step();

        let pose = self.vehicle.pose();
        let velocity = self.vehicle.velocity();
        let local_velocity = pose.inverse_transform_direction(&velocity);

        // waypoint is projected to the height of the car
        let waypoint = self.track.waypoint(self.sh.get_cur_waypoint());
        let target = Point3::new(waypoint.x, pose.position.y, waypoint.z);
        let rel_waypoint = pose.inverse_transform_point(&target);

        self.current_speed = wheel_speed(&self.vehicle);

        // spoiler downforce
        self.vehicle
            .add_impulse(-pose.up() * (local_velocity.z * self.pars.spoiler_ratio));

        let cmd = self.driver.decide(&Observation {
            time: t_now,
            pose,
            velocity,
            local_velocity,
            rel_waypoint,
            current_speed: self.current_speed,
            sensor,
        });

        self.apply_grip(cmd.grip);

        if rel_waypoint.norm() < self.track.waypoint_threshold
            && self.sh.advance() == WaypointAdvance::LapCompleted
        {
            match self.driver.kind() {
                DriverKind::Ai => coordinator.lap_finished_by_ai(self.car_no),
                DriverKind::Player => coordinator.lap_finished_by_player(self.car_no),
            }
        }

        for wheel in Wheel::FRONT.iter() {
            self.vehicle
                .set_steer_angle(*wheel, cmd.steer * self.pars.max_turn_angle);
        }

        // rear wheel drive, motor is cut outside of the speed range
        let motor_torque = if self.current_speed >= self.pars.top_speed_reverse
            && self.current_speed < self.pars.top_speed
        {
            cmd.throttle * self.pars.max_torque
        } else {
            0.0
        };
        for wheel in Wheel::REAR.iter() {
            self.vehicle.set_motor_torque(*wheel, motor_torque);
        }

        if let Some(brakes) = cmd.brakes {
            self.apply_brakes(brakes);
        }

        if cmd.reset {
            self.reset_to_last_waypoint();
        }

        self.last_cmd = cmd;
    }

    fn apply_grip(&mut self, grip: Grip) {
        let (forward, sideways) = match grip {
            Grip::Handbrake => (
                self.pars.handbrake_forward_slip,
                self.pars.handbrake_sideways_slip,
            ),
            Grip::Nominal => (1.0, 1.0),
        };
        for wheel in Wheel::REAR.iter() {
            self.vehicle.set_friction_stiffness(*wheel, forward, sideways);
        }
    }

    /// apply_brakes sets the brake torques requested by the player. The handbrake sets the front
    /// left torque but subtracts from the front right one, so the front right torque keeps
    /// decreasing while the handbrake is held.
    fn apply_brakes(&mut self, brakes: BrakeCommand) {
        if brakes.handbrake {
            let fr_torque = self.vehicle.brake_torque(Wheel::FrontRight);
            self.vehicle
                .set_brake_torque(Wheel::FrontLeft, self.pars.max_brake_torque);
            self.vehicle
                .set_brake_torque(Wheel::FrontRight, fr_torque - self.pars.max_brake_torque);
        } else {
            self.vehicle.set_brake_torque(Wheel::FrontLeft, 0.0);
            self.vehicle.set_brake_torque(Wheel::FrontRight, 0.0);
        }

        let rear_torque = match brakes.rear {
            RearBrake::Hard => self.pars.deceleration_torque + self.pars.max_torque,
            RearBrake::Idle => self.pars.deceleration_torque,
            RearBrake::Released => 0.0,
        };
        for wheel in Wheel::REAR.iter() {
            self.vehicle.set_brake_torque(*wheel, rear_torque);
        }
    }

    /// reset_to_last_waypoint puts the car onto its last waypoint facing the current one.
    pub fn reset_to_last_waypoint(&mut self) {
        let pose = self.respawn_pose();
        self.vehicle.set_pose(pose);
        debug!(car_no = self.car_no, "Car reset to its last waypoint");
    }

    fn respawn_pose(&self) -> Pose {
        let last = self.get_last_waypoint_position();
        let next = self.get_current_waypoint_position();
        let orientation = look_rotation(&(next - last)).unwrap_or_else(|| self.vehicle.pose().orientation);
        Pose::new(last, orientation)
    }

    /// frame_update refreshes the feedback signals and handles the flipper of AI cars: a car
    /// driving backwards fast gets a flip scheduled, and if it is still doing so when the flip
    /// is due it is turned towards its waypoint.
    pub fn frame_update(&mut self, t_now: f64, frame_dt: f64) {
        if self.status == CarStatus::Retired {
            return;
        }

        self.feedback.update(
            &self.vehicle,
            self.current_speed,
            self.last_cmd.throttle,
            self.last_cmd.handbrake_engaged(),
            self.pars.top_speed,
            self.pars.top_speed_reverse,
            frame_dt,
        );

        if self.driver.kind() != DriverKind::Ai {
            return;
        }

        for _ in self.flips.take_due(t_now) {
            self.pending_flip = None;
            if self.current_speed < FLIP_EXECUTE_SPEED {
                self.flip(frame_dt);
            }
        }

        if self.current_speed < FLIP_SCHEDULE_SPEED && self.pending_flip.is_none() {
            self.pending_flip = Some(self.flips.schedule(t_now + FLIP_DELAY, Flip));
            debug!(car_no = self.car_no, t_due = t_now + FLIP_DELAY, "Scheduled flip");
        }
    }

    fn flip(&mut self, frame_dt: f64) {
        let pose = self.vehicle.pose();
        let target_dir = self.get_current_waypoint_position() - pose.position;
        let max_step = self.current_speed.abs() * frame_dt;
        let new_dir = rotate_towards(&pose.forward(), &target_dir, max_step);

        if let Some(orientation) = look_rotation(&new_dir) {
            self.vehicle.set_pose(Pose::new(pose.position, orientation));
            debug!(car_no = self.car_no, "Flipped car towards its waypoint");
        }
    }

    /// retire takes the car out of the race and cancels everything it still had scheduled.
    pub fn retire(&mut self) {
        if self.status == CarStatus::Retired {
            return;
        }
        if let Some(id) = self.pending_flip.take() {
            self.flips.cancel(id);
        }
        self.status = CarStatus::Retired;
        info!(car_no = self.car_no, "Car retired");
    }

    pub fn get_current_waypoint_position(&self) -> Point3<f64> {
        self.track.waypoint(self.sh.get_cur_waypoint())
    }

    pub fn get_last_waypoint_position(&self) -> Point3<f64> {
        self.track.waypoint(self.sh.get_last_waypoint())
    }
}

impl<V: VehicleActuation> Contestant for Car<V> {
    fn get_car_no(&self) -> u32 {
        self.car_no
    }

    fn get_pose(&self) -> Pose {
        self.vehicle.pose()
    }

    fn get_current_waypoint(&self) -> usize {
        self.sh.get_cur_waypoint()
    }

    fn get_current_waypoint_position(&self) -> Point3<f64> {
        Car::get_current_waypoint_position(self)
    }

    fn get_last_waypoint_position(&self) -> Point3<f64> {
        Car::get_last_waypoint_position(self)
    }

    fn respawn(&mut self, pose: Pose) {
        self.vehicle.set_velocity(Vector3::zeros());
        self.vehicle.set_pose(pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinator::RacePars;
    use crate::core::driver::{AiDriver, PlayerDriver, PlayerInput};
    use crate::core::sensor::OpenRoad;
    use crate::core::testing::RecordingVehicle;
    use approx::assert_relative_eq;

    fn straight_track() -> Rc<Track> {
        Rc::new(
            Track::from_waypoints(
                "straight",
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(0.0, 0.0, 100.0),
                    Point3::new(50.0, 0.0, 150.0),
                ],
                25.0,
            )
            .unwrap(),
        )
    }

    fn racing_coordinator(ai_car_nos: &[u32]) -> RaceCoordinator {
        let mut coordinator = RaceCoordinator::new(
            &RacePars {
                countdown_delay: 0,
                ..RacePars::default()
            },
            ai_car_nos,
        );
        let mut nobody: Vec<Car<RecordingVehicle>> = vec![];
        coordinator.update(0.02, &mut nobody);
        assert!(coordinator.is_racing());
        coordinator
    }

    fn ai_car(vehicle: RecordingVehicle) -> Car<RecordingVehicle> {
        Car::new(
            1,
            &CarPars::default(),
            straight_track(),
            vehicle,
            Box::new(AiDriver::new(SensorRig::default())),
        )
    }

    fn player_car(vehicle: RecordingVehicle, input: PlayerInput) -> Car<RecordingVehicle> {
        let mut driver = PlayerDriver::new();
        driver.set_input(input);
        Car::new(0, &CarPars::default(), straight_track(), vehicle, Box::new(driver))
    }

    #[test]
    fn center_of_mass_is_lowered_on_creation() {
        let car = ai_car(RecordingVehicle::at(Point3::new(0.0, 0.0, -30.0)));
        assert_relative_eq!(car.vehicle.com_offset, Vector3::new(0.0, -0.9, 0.0));
    }

    #[test]
    fn nothing_is_actuated_before_the_start() {
        let mut coordinator = RaceCoordinator::new(&RacePars::default(), &[1]);
        let mut car = ai_car(RecordingVehicle::at(Point3::new(10.0, 0.0, -30.0)));
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);

        assert!(car.vehicle.impulses.is_empty());
        assert_eq!(car.vehicle.steer, [0.0; 4]);
        assert_eq!(car.vehicle.motor, [0.0; 4]);
    }

    #[test]
    fn ai_steers_front_and_drives_rear_wheels() {
        let mut coordinator = racing_coordinator(&[1]);
        // waypoint 0 lies 40 ahead and 9 to the right
        let mut vehicle = RecordingVehicle::at(Point3::new(-9.0, 0.0, -40.0));
        vehicle.velocity = Vector3::new(0.0, 0.0, 4.0);
        let mut car = ai_car(vehicle);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);

        let steer = 2.0 * 9.0 / 41.0 * 10.0;
        assert_relative_eq!(car.vehicle.steer[Wheel::FrontLeft.index()], steer, epsilon = 1e-9);
        assert_relative_eq!(car.vehicle.steer[Wheel::FrontRight.index()], steer, epsilon = 1e-9);
        assert_relative_eq!(car.vehicle.steer[Wheel::RearLeft.index()], 0.0);

        let torque = 40.0 / 41.0 * 10.0;
        assert_relative_eq!(car.vehicle.motor[Wheel::RearLeft.index()], torque, epsilon = 1e-9);
        assert_relative_eq!(car.vehicle.motor[Wheel::RearRight.index()], torque, epsilon = 1e-9);
        assert_relative_eq!(car.vehicle.motor[Wheel::FrontLeft.index()], 0.0);

        // downforce pushes along -up with the forward speed
        assert_relative_eq!(car.vehicle.impulses[0], Vector3::new(0.0, -0.4, 0.0), epsilon = 1e-12);
        // AI cars never touch the brakes
        assert_eq!(car.vehicle.brake, [0.0; 4]);
    }

    #[test]
    fn governor_cuts_the_motor_at_top_speed() {
        let mut coordinator = racing_coordinator(&[1]);
        let mut vehicle = RecordingVehicle::at(Point3::new(0.0, 0.0, -60.0));
        vehicle.set_current_speed(151.0);
        let mut car = ai_car(vehicle);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);
        assert_relative_eq!(car.vehicle.motor[Wheel::RearLeft.index()], 0.0);

        car.vehicle.set_current_speed(-49.0);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.02);
        assert!(car.vehicle.motor[Wheel::RearLeft.index()] > 0.0);

        car.vehicle.set_current_speed(-60.0);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.04);
        assert_relative_eq!(car.vehicle.motor[Wheel::RearLeft.index()], 0.0);
    }

    #[test]
    fn ai_slides_through_sharp_turns_at_speed() {
        let mut coordinator = racing_coordinator(&[1]);
        let mut vehicle = RecordingVehicle::at(Point3::new(-80.0, 0.0, -60.0));
        vehicle.velocity = Vector3::new(0.0, 0.0, 15.0);
        let mut car = ai_car(vehicle);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);

        assert!(car.get_last_command().handbrake_engaged());
        assert_eq!(car.vehicle.stiffness[Wheel::RearLeft.index()], (0.04, 0.08));
        assert_eq!(car.vehicle.stiffness[Wheel::RearRight.index()], (0.04, 0.08));
        assert_eq!(car.vehicle.stiffness[Wheel::FrontLeft.index()], (1.0, 1.0));

        car.vehicle.pose = Pose::new(Point3::new(0.0, 0.0, -60.0), car.vehicle.pose.orientation);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.02);
        assert_eq!(car.vehicle.stiffness[Wheel::RearLeft.index()], (1.0, 1.0));
    }

    #[test]
    fn reaching_the_last_waypoint_reports_an_ai_lap() {
        let mut coordinator = racing_coordinator(&[1]);
        let mut car = ai_car(RecordingVehicle::at(Point3::new(0.0, 0.0, 10.0)));

        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);
        assert_eq!(car.sh.get_cur_waypoint(), 1);

        car.sh.advance();
        car.vehicle.pose = Pose::new(Point3::new(45.0, 0.0, 140.0), car.vehicle.pose.orientation);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.02);

        assert_eq!(car.sh.get_cur_waypoint(), 0);
        assert!(car.sh.get_new_lap());
        assert_eq!(coordinator.laps(1), Some(1));
        assert_eq!(coordinator.player_laps(), 0);
    }

    #[test]
    fn waypoint_height_is_ignored() {
        let mut coordinator = racing_coordinator(&[1]);
        let mut car = ai_car(RecordingVehicle::at(Point3::new(0.0, 40.0, 10.0)));
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);
        assert_eq!(car.sh.get_cur_waypoint(), 1);
    }

    #[test]
    fn player_laps_are_reported_as_player_laps() {
        let mut coordinator = racing_coordinator(&[1]);
        let mut car = player_car(RecordingVehicle::at(Point3::new(50.0, 0.0, 150.0)), PlayerInput::default());
        car.sh.advance();
        car.sh.advance();
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);

        assert_eq!(coordinator.player_laps(), 1);
        assert_eq!(coordinator.laps(1), Some(0));
    }

    #[test]
    fn player_handbrake_torque_is_asymmetric() {
        let mut coordinator = racing_coordinator(&[]);
        let mut vehicle = RecordingVehicle::at(Point3::new(0.0, 0.0, -60.0));
        vehicle.velocity = Vector3::new(0.0, 0.0, 8.0);
        let input = PlayerInput {
            handbrake: true,
            ..PlayerInput::default()
        };
        let mut car = player_car(vehicle, input);

        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::FrontLeft.index()], 100.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::FrontRight.index()], -100.0);

        car.fixed_update(&mut coordinator, &OpenRoad, 0.02);
        assert_relative_eq!(car.vehicle.brake[Wheel::FrontLeft.index()], 100.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::FrontRight.index()], -200.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::RearLeft.index()], 0.0);
        assert_eq!(car.vehicle.stiffness[Wheel::RearLeft.index()], (0.04, 0.08));
    }

    #[test]
    fn player_deceleration_depends_on_the_vertical_axis() {
        let mut coordinator = racing_coordinator(&[]);
        let mut vehicle = RecordingVehicle::at(Point3::new(0.0, 0.0, -60.0));
        vehicle.velocity = Vector3::new(0.0, 0.0, 8.0);
        let mut car = player_car(vehicle, PlayerInput::default());

        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::RearLeft.index()], 30.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::FrontRight.index()], 0.0);

        let mut driver = PlayerDriver::new();
        driver.set_input(PlayerInput {
            vertical: -1.0,
            ..PlayerInput::default()
        });
        car.driver = Box::new(driver);
        car.fixed_update(&mut coordinator, &OpenRoad, 0.02);
        assert_relative_eq!(car.vehicle.brake[Wheel::RearLeft.index()], 40.0);
        assert_relative_eq!(car.vehicle.brake[Wheel::RearRight.index()], 40.0);
        assert_relative_eq!(car.vehicle.motor[Wheel::RearLeft.index()], -10.0);
    }

    #[test]
    fn player_reset_returns_to_the_last_waypoint() {
        let mut coordinator = racing_coordinator(&[]);
        let input = PlayerInput {
            reset: true,
            ..PlayerInput::default()
        };
        let mut car = player_car(RecordingVehicle::at(Point3::new(300.0, 0.0, 300.0)), input);
        car.sh.advance();
        car.fixed_update(&mut coordinator, &OpenRoad, 0.0);

        assert_relative_eq!(car.vehicle.pose.position, Point3::origin());
        assert_relative_eq!(car.vehicle.pose.forward(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn flip_is_scheduled_once_and_turns_the_car_when_due() {
        let mut vehicle = RecordingVehicle::at(Point3::new(-60.0, 0.0, -60.0));
        // facing backwards, away from waypoint 0
        vehicle.pose = Pose::looking_at(vehicle.pose.position, &Point3::new(-60.0, 0.0, -100.0));
        let mut car = ai_car(vehicle);

        car.current_speed = -45.0;
        car.frame_update(1.0, 0.02);
        assert!(car.has_pending_flip());
        car.frame_update(1.5, 0.02);
        assert_eq!(car.flips.len(), 1);

        car.current_speed = -60.0;
        car.frame_update(5.9, 0.02);
        assert_relative_eq!(car.vehicle.pose.forward(), -Vector3::z(), epsilon = 1e-12);

        car.frame_update(6.0, 0.02);
        let turned = car.vehicle.pose.forward();
        assert_relative_eq!(turned.angle(&-Vector3::z()), 1.2, epsilon = 1e-9);
        // rescheduled right away as the car is still reversing
        assert!(car.has_pending_flip());
    }

    #[test]
    fn slow_reversing_car_is_not_flipped() {
        let mut car = ai_car(RecordingVehicle::at(Point3::new(0.0, 0.0, -60.0)));
        let forward = car.vehicle.pose.forward();

        car.current_speed = -45.0;
        car.frame_update(0.0, 0.02);
        car.frame_update(5.0, 0.02);
        assert_relative_eq!(car.vehicle.pose.forward(), forward);
    }

    #[test]
    fn retiring_cancels_a_pending_flip() {
        let mut car = ai_car(RecordingVehicle::at(Point3::new(0.0, 0.0, -60.0)));
        car.current_speed = -45.0;
        car.frame_update(0.0, 0.02);
        assert!(car.has_pending_flip());

        car.retire();
        assert!(!car.has_pending_flip());
        assert!(car.flips.is_empty());
        assert_eq!(car.status, CarStatus::Retired);
    }

    #[test]
    fn player_cars_never_flip() {
        let mut car = player_car(RecordingVehicle::at(Point3::origin()), PlayerInput::default());
        car.current_speed = -80.0;
        car.frame_update(0.0, 0.02);
        assert!(!car.has_pending_flip());
    }
}
