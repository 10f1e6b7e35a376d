use anyhow::Context;
use helpers::general::{wrap_next, wrap_prev, InputValueError};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use std::f64::consts::PI;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Distance (world units) at which a car counts a waypoint as reached.
pub const DEFAULT_WAYPOINT_THRESHOLD: f64 = 25.0;

/// * `name` - Track name, also used to look up `input/tracks/{name}.csv` if no other waypoint
/// source is given
/// * `waypoints` - Inline waypoint positions [x, y, z]
/// * `waypoint_file` - CSV file with header `x_m,y_m,z_m`
/// * `oval` - Procedurally generated oval
/// * `waypoint_threshold` - Distance at which a waypoint counts as reached
#[derive(Debug, Deserialize, Clone)]
pub struct TrackPars {
    pub name: String,
    #[serde(default)]
    pub waypoints: Vec<[f64; 3]>,
    #[serde(default)]
    pub waypoint_file: Option<PathBuf>,
    #[serde(default)]
    pub oval: Option<OvalPars>,
    #[serde(default = "default_waypoint_threshold")]
    pub waypoint_threshold: f64,
}

fn default_waypoint_threshold() -> f64 {
    DEFAULT_WAYPOINT_THRESHOLD
}

/// * `no_waypoints` - Number of waypoints placed on the ellipse
/// * `radius_x` - Half axis along x
/// * `radius_z` - Half axis along z
/// * `jitter_std` - Standard deviation of the radial noise added to every waypoint
/// * `seed` - Seed of the noise generator
#[derive(Debug, Deserialize, Clone)]
pub struct OvalPars {
    pub no_waypoints: usize,
    pub radius_x: f64,
    pub radius_z: f64,
    #[serde(default)]
    pub jitter_std: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvWaypointEl {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

/// Track is the cyclic sequence of waypoints every car has to visit in order. It is read-only
/// after loading and shared by all cars of a race.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub waypoint_threshold: f64,
    waypoints: Vec<Point3<f64>>,
}

impl Track {
    /// Loads the waypoints from the first available source: inline list, CSV file, oval
    /// parameters, and finally `input/tracks/{name}.csv`.
    pub fn new(track_pars: &TrackPars) -> anyhow::Result<Track> {
        let waypoints = if !track_pars.waypoints.is_empty() {
            track_pars
                .waypoints
                .iter()
                .map(|p| Point3::new(p[0], p[1], p[2]))
                .collect()
        } else if let Some(path) = &track_pars.waypoint_file {
            read_waypoints_csv(path)?
        } else if let Some(oval_pars) = &track_pars.oval {
            generate_oval(oval_pars)?
        } else {
            let mut trackfile_path = PathBuf::new();
            trackfile_path.push("input");
            trackfile_path.push("tracks");
            trackfile_path.push(&track_pars.name);
            trackfile_path.set_extension("csv");
            read_waypoints_csv(&trackfile_path)?
        };

        let track = Track::from_waypoints(
            &track_pars.name,
            waypoints,
            track_pars.waypoint_threshold,
        )
        .context(format!("Track {} is invalid!", track_pars.name))?;
        Ok(track)
    }

    pub fn from_waypoints(
        name: &str,
        waypoints: Vec<Point3<f64>>,
        waypoint_threshold: f64,
    ) -> Result<Track, InputValueError> {
        if waypoints.is_empty() {
            return Err(InputValueError::new("a track needs at least one waypoint"));
        }
        if !(waypoint_threshold > 0.0) {
            return Err(InputValueError::new(format!(
                "waypoint threshold must be positive, but is {}",
                waypoint_threshold
            )));
        }
        Ok(Track {
            name: name.to_owned(),
            waypoint_threshold,
            waypoints,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false, a track holds at least one waypoint.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Point3<f64>] {
        &self.waypoints
    }

    /// Waypoint position for the given index, the index wraps around the track length.
    pub fn waypoint(&self, idx: usize) -> Point3<f64> {
        self.waypoints[idx % self.waypoints.len()]
    }

    pub fn next_idx(&self, idx: usize) -> usize {
        wrap_next(idx, self.waypoints.len())
    }

    pub fn prev_idx(&self, idx: usize) -> usize {
        wrap_prev(idx, self.waypoints.len())
    }

    /// Length of the closed waypoint polygon.
    pub fn polygon_length(&self) -> f64 {
        (0..self.len())
            .map(|i| (self.waypoint(self.next_idx(i)) - self.waypoint(i)).norm())
            .sum()
    }
}

/// read_waypoints_csv reads a CSV file with the columns `x_m`, `y_m` and `z_m`.
pub fn read_waypoints_csv(filepath: &Path) -> anyhow::Result<Vec<Point3<f64>>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open waypoint file {}!",
            filepath.display()
        ))?;

    let mut csv_reader = csv::Reader::from_reader(&fh);
    let mut waypoints = vec![];

    for result in csv_reader.deserialize() {
        let el: CsvWaypointEl = result.context(format!(
            "Failed to parse waypoint file {}!",
            filepath.display()
        ))?;
        waypoints.push(Point3::new(el.x_m, el.y_m, el.z_m));
    }

    Ok(waypoints)
}

/// generate_oval places the waypoints counter-clockwise (seen from +y) on an ellipse in the
/// x-z plane, starting on the positive x half axis. Radial noise is reproducible via the seed.
pub fn generate_oval(oval_pars: &OvalPars) -> Result<Vec<Point3<f64>>, InputValueError> {
    if oval_pars.no_waypoints == 0 {
        return Err(InputValueError::new("an oval needs at least one waypoint"));
    }
    if !(oval_pars.jitter_std >= 0.0 && oval_pars.jitter_std.is_finite()) {
        return Err(InputValueError::new(format!(
            "oval jitter must be a non-negative number, but is {}",
            oval_pars.jitter_std
        )));
    }
    let normal = Normal::new(0.0, oval_pars.jitter_std).map_err(|e| {
        InputValueError::new(format!("oval jitter distribution is invalid: {}", e))
    })?;
    let mut rng = StdRng::seed_from_u64(oval_pars.seed);

    let waypoints = (0..oval_pars.no_waypoints)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / oval_pars.no_waypoints as f64;
            let jitter = if oval_pars.jitter_std > 0.0 {
                normal.sample(&mut rng)
            } else {
                0.0
            };
            Point3::new(
                (oval_pars.radius_x + jitter) * angle.cos(),
                0.0,
                (oval_pars.radius_z + jitter) * angle.sin(),
            )
        })
        .collect();

    Ok(waypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn square() -> Track {
        Track::from_waypoints(
            "square",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(100.0, 0.0, 0.0),
                Point3::new(100.0, 0.0, 100.0),
                Point3::new(0.0, 0.0, 100.0),
            ],
            DEFAULT_WAYPOINT_THRESHOLD,
        )
        .unwrap()
    }

    #[test]
    fn empty_waypoint_list_is_rejected() {
        let err = Track::from_waypoints("none", vec![], 25.0).unwrap_err();
        assert!(err.what.contains("at least one waypoint"));
    }

    #[test]
    fn indices_wrap_around_the_track() {
        let track = square();
        assert_eq!(track.next_idx(3), 0);
        assert_eq!(track.prev_idx(0), 3);
        assert_eq!(track.waypoint(5), track.waypoint(1));
        assert_relative_eq!(track.polygon_length(), 400.0);
    }

    #[test]
    fn oval_is_reproducible_for_a_seed() {
        let pars = OvalPars {
            no_waypoints: 12,
            radius_x: 150.0,
            radius_z: 90.0,
            jitter_std: 4.0,
            seed: 7,
        };
        let a = generate_oval(&pars).unwrap();
        let b = generate_oval(&pars).unwrap();
        assert_eq!(a.len(), 12);
        assert_eq!(a, b);

        let smooth = generate_oval(&OvalPars {
            jitter_std: 0.0,
            ..pars
        })
        .unwrap();
        assert_relative_eq!(smooth[0].x, 150.0);
        assert_relative_eq!(smooth[3].z, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_jitter_is_rejected() {
        let pars = OvalPars {
            no_waypoints: 4,
            radius_x: 10.0,
            radius_z: 10.0,
            jitter_std: -1.0,
            seed: 0,
        };
        let err = generate_oval(&pars).unwrap_err();
        assert!(err.what.contains("non-negative"));

        let pars = OvalPars {
            jitter_std: f64::NAN,
            ..pars
        };
        assert!(generate_oval(&pars).is_err());
    }

    #[test]
    fn waypoints_are_read_from_csv() {
        let path = std::env::temp_dir().join("racectl_track_waypoints.csv");
        let mut fh = std::fs::File::create(&path).unwrap();
        writeln!(fh, "x_m,y_m,z_m").unwrap();
        writeln!(fh, "0.0,0.5,0.0").unwrap();
        writeln!(fh, "50.0,0.5,10.0").unwrap();
        drop(fh);

        let track = Track::new(&TrackPars {
            name: "csv".to_owned(),
            waypoints: vec![],
            waypoint_file: Some(path.clone()),
            oval: None,
            waypoint_threshold: 25.0,
        })
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(track.len(), 2);
        assert_relative_eq!(track.waypoint(1).z, 10.0);
    }
}
