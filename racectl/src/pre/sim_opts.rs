use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "racectl",
    about = "Waypoint-following AI drivers and race coordination for an arcade racer"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Stream race snapshots to an observer thread, the race is simulated in real-time
    #[clap(short, long)]
    pub stream: bool,

    /// Export a top-down plot of the car trajectories
    #[clap(long)]
    pub plot: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (ignored in streaming mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file
    #[clap(short, long, default_value = "input/parameters/pars_oval.json")]
    pub parfile_path: PathBuf,

    /// Set real-time factor (only relevant in streaming mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set simulation timestep size in seconds, should be in the range [0.001, 1.0]
    #[clap(short, long, default_value = "0.02")]
    pub timestep_size: f64,

    /// Set directory the result files are written to
    #[clap(short, long, default_value = "output")]
    pub output_dir: PathBuf,
}
