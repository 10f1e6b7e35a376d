use helpers::general::{wrap_next, wrap_prev};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointAdvance {
    Next,
    LapCompleted,
}

/// StateHandler tracks a car's progress along the cyclic waypoint sequence: the waypoint it is
/// heading for and the laps it has completed.
#[derive(Debug, Clone)]
pub struct StateHandler {
    track_len: usize,
    cur_waypoint: usize,
    compl_lap_prev: u32,
    compl_lap_cur: u32,
}

impl StateHandler {
    pub fn new(track_len: usize, start_waypoint: usize) -> StateHandler {
        assert!(track_len > 0, "A track must contain at least one waypoint!");
        StateHandler {
            track_len,
            cur_waypoint: start_waypoint % track_len,
            compl_lap_prev: 0,
            compl_lap_cur: 0,
        }
    }

    /// begin_step remembers the lap count at the start of a physics step such that get_new_lap
    /// reports laps completed during that step only.
    pub fn begin_step(&mut self) {
        self.compl_lap_prev = self.compl_lap_cur;
    }

    /// advance moves on to the next waypoint. Wrapping around to waypoint 0 completes a lap.
    pub fn advance(&mut self) -> WaypointAdvance {
        self.cur_waypoint = wrap_next(self.cur_waypoint, self.track_len);

        if self.cur_waypoint == 0 {
            self.compl_lap_cur += 1;
            WaypointAdvance::LapCompleted
        } else {
            WaypointAdvance::Next
        }
    }

    pub fn get_cur_waypoint(&self) -> usize {
        self.cur_waypoint
    }

    /// get_last_waypoint returns the waypoint passed before the current one.
    pub fn get_last_waypoint(&self) -> usize {
        wrap_prev(self.cur_waypoint, self.track_len)
    }

    pub fn get_compl_lap(&self) -> u32 {
        self.compl_lap_cur
    }

    pub fn get_new_lap(&self) -> bool {
        self.compl_lap_cur > self.compl_lap_prev
    }

    /// get_race_prog returns completed laps plus the fraction of the lap given by the current
    /// waypoint index.
    pub fn get_race_prog(&self) -> f64 {
        self.compl_lap_cur as f64 + self.cur_waypoint as f64 / self.track_len as f64
    }
}
