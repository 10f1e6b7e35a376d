use clap::Parser;
use plotters::prelude::*;
use racectl::core::handle_race::handle_race;
use racectl::interfaces::telemetry::RaceSnapshot;
use racectl::post::race_result::RaceResult;
use racectl::pre::read_sim_pars::read_sim_pars;
use racectl::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn parse_color(color: &str) -> RGBColor {
    match color.parse::<css_color_parser::Color>() {
        Ok(c) => RGBColor(c.r, c.g, c.b),
        Err(_) => BLACK,
    }
}

/// export_trajectory_plot draws the sampled car trajectories on top of the waypoint polygon
/// (top-down view, x over z).
fn export_trajectory_plot(result: &RaceResult, out_dir: &Path) -> anyhow::Result<String> {
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let out_path = out_dir.join(format!("race_plot_{}.png", ts));

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut z_min = f64::INFINITY;
    let mut z_max = f64::NEG_INFINITY;
    let all_points = result
        .waypoints
        .iter()
        .map(|wp| (wp[0], wp[2]))
        .chain(
            result
                .trajectories
                .iter()
                .flat_map(|traj| traj.points.iter().map(|p| (p[0], p[1]))),
        );
    for (x, z) in all_points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        z_min = z_min.min(z);
        z_max = z_max.max(z);
    }
    if !x_min.is_finite() || !z_min.is_finite() {
        anyhow::bail!("Nothing to plot, neither waypoints nor trajectories are available!");
    }
    let margin = 0.05 * (x_max - x_min).max(z_max - z_min).max(1.0);

    let root = BitMapBackend::new(&out_path, (1280, 1280)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} ({:.1}s)", result.track_name, result.race_time),
            ("sans-serif", 24).into_font(),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (x_min - margin)..(x_max + margin),
            (z_min - margin)..(z_max + margin),
        )?;

    chart
        .configure_mesh()
        .x_desc("x in m")
        .y_desc("z in m")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    // closed waypoint polygon
    let mut polygon: Vec<(f64, f64)> = result.waypoints.iter().map(|wp| (wp[0], wp[2])).collect();
    if let Some(&first) = polygon.first() {
        polygon.push(first);
    }
    chart.draw_series(std::iter::once(PathElement::new(
        polygon.to_owned(),
        RGBColor(150, 150, 150).stroke_width(2),
    )))?;
    chart.draw_series(
        polygon
            .iter()
            .map(|&p| Circle::new(p, 3, RGBColor(150, 150, 150).filled())),
    )?;

    for traj in result.trajectories.iter() {
        let color = parse_color(&traj.color);
        chart
            .draw_series(LineSeries::new(
                traj.points.iter().map(|p| (p[0], p[1])),
                color,
            ))?
            .label(format!("car {}", traj.car_no))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

fn log_snapshot(snapshot: &RaceSnapshot) {
    if let Some(countdown) = snapshot.countdown {
        info!(t = snapshot.race_time, ?countdown, "Countdown");
        return;
    }
    for car in snapshot.car_snapshots.iter() {
        tracing::debug!(
            t = snapshot.race_time,
            car_no = car.car_no,
            player = car.is_player,
            x = car.position[0],
            z = car.position[2],
            prog = car.race_prog,
            speed = car.current_speed,
            lights = ?car.lights,
            "Snapshot"
        );
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    let default_filter = if sim_opts.debug {
        "racectl=debug,cli=debug"
    } else {
        "racectl=info,cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // get simulation parameters
    info!(path = ?sim_opts.parfile_path, "Reading simulation parameters");
    let sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    info!(
        track = %sim_pars.track_pars.name,
        lap_target = sim_pars.race_pars.lap_target,
        timestep_size = sim_opts.timestep_size,
        "Simulating race"
    );

    // EXECUTION -----------------------------------------------------------------------------------
    let race_results: Vec<RaceResult> = if !sim_opts.stream {
        // NON-STREAMING CASE - independent runs in parallel
        let t_start = Instant::now();

        let race_results = (0..sim_opts.no_sim_runs.max(1))
            .into_par_iter()
            .map(|_| handle_race(&sim_pars, sim_opts.timestep_size, None, 1.0))
            .collect::<anyhow::Result<Vec<RaceResult>>>()?;

        info!(
            no_sim_runs = race_results.len(),
            t_exec_ms = t_start.elapsed().as_millis() as u64,
            "Execution finished"
        );
        race_results
    } else {
        // STREAMING CASE - real-time simulation observed from the main thread
        let (tx, rx) = flume::unbounded();

        let sim_opts_thread = sim_opts.clone();
        let sim_pars_thread = sim_pars.clone();
        let sim_handle = thread::spawn(move || {
            handle_race(
                &sim_pars_thread,
                sim_opts_thread.timestep_size,
                Some(&tx),
                sim_opts_thread.realtime_factor,
            )
        });

        for snapshot in rx.iter() {
            log_snapshot(&snapshot);
            if snapshot.final_result.is_some() {
                break;
            }
        }

        let race_result = sim_handle
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??;
        vec![race_result]
    };

    // POST-PROCESSING -----------------------------------------------------------------------------
    for (i, race_result) in race_results.iter().enumerate() {
        race_result.print_standings();

        let out_path = if race_results.len() > 1 {
            sim_opts.output_dir.join(format!("run_{}.txt", i))
        } else {
            sim_opts.output_dir.join("last_run.txt")
        };
        let written = race_result.write_standings_to_file(Some(&out_path))?;
        info!(path = %written, "Standings written");
    }

    if sim_opts.plot {
        if let Some(race_result) = race_results.first() {
            match export_trajectory_plot(race_result, &sim_opts.output_dir) {
                Ok(path) => info!(path = %path, "Trajectory plot written"),
                Err(e) => warn!(error = %e, "Could not export trajectory plot"),
            }
        }
    }

    Ok(())
}
