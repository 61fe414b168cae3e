//! # MPPI Executable
//!
//! Runs the critics against a simple scenario without requiring a full controller or robot: a
//! straight reference path with obstacles dropped onto it, and a robot which drives along the
//! cheapest of a fixed fan of rollouts each cycle.
//!
//! # Architecture
//!
//!     - Initialise the session, logging and parameters
//!     - Build the costmap, reference path and critics
//!     - Main loop:
//!         - Roll out the fan of trajectories from the current pose
//!         - Score the batch with the critics
//!         - Advance the robot along the cheapest trajectory
//!         - Archive the cycle

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use ndarray::Array1;
use serde::Serialize;

use mppi_lib::{
    costmap::{Costmap, LETHAL_OBSTACLE},
    critic_manager::CriticManager,
    models::{CriticData, Path, Pose2, State, Trajectories, Twist2},
    params::MppiExecParams,
    utils::{shortest_angular_distance, within_position_goal_tolerance},
};
use util::{
    logger::{logger_init, LevelFilter},
    params::ParamStore,
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Parameter file holding both the scenario and the controller parameters.
const PARAMS_FILE: &str = "mppi.toml";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Archived record of a single cycle.
#[derive(Serialize)]
struct CycleRecord {
    cycle: usize,
    time_s: f64,
    pose: Pose2,
    chosen: usize,
    curvature_m: f64,
    furthest_reached_path_point: Option<usize>,
    costs: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mppi_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("MPPI Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: MppiExecParams =
        util::params::load(PARAMS_FILE).wrap_err("Could not load exec params")?;
    let param_store = ParamStore::load(PARAMS_FILE).wrap_err("Could not load controller params")?;
    let demo = &exec_params.demo;

    if demo.num_rollouts == 0 || demo.time_steps == 0 || demo.steps_per_cycle == 0 {
        return Err(eyre!(
            "The demo needs at least one rollout, time step and step per cycle"
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE COSTMAP ----

    let mut costmap =
        Costmap::new(exec_params.costmap.clone()).wrap_err("Could not create the costmap")?;

    for &[x_m, y_m, radius_m] in demo.obstacles_m.iter() {
        let num_cells = costmap.fill_circle(Vector2::new(x_m, y_m), radius_m, LETHAL_OBSTACLE);
        info!(
            "Obstacle of radius {:.2} m at ({:.2}, {:.2}) covers {} cells",
            radius_m, x_m, y_m, num_cells
        );
    }

    let costmap = costmap.into_shared();

    // ---- INITIALISE PATH AND CRITICS ----

    let start = Pose2::new(demo.start_pose[0], demo.start_pose[1], demo.start_pose[2]);
    let goal_m = Vector2::new(demo.goal_m[0], demo.goal_m[1]);

    let path = Path::direct(start.position_m, goal_m, demo.path_point_sep_m)
        .wrap_err("Could not create the reference path")?;

    info!(
        "Reference path of {} points, {:.2} m long",
        path.len(),
        path.length_m().unwrap_or(0.0)
    );

    let mut critic_manager =
        CriticManager::on_configure(&exec_params.controller_ns, &param_store, costmap)
            .wrap_err("Could not configure the critics")?;

    info!("Critics: {:?}\n", critic_manager.critic_names());

    let curvatures_m = rollout_curvatures(demo.num_rollouts, demo.max_curvature_m);
    let advance_step = demo.steps_per_cycle.min(demo.time_steps) - 1;

    // ---- MAIN LOOP ----

    let mut state = State::at(start);
    let mut goal_reached = false;

    for cycle in 0..demo.max_cycles {
        if within_position_goal_tolerance(demo.goal_tolerance_m, &state.pose, &path) {
            info!("Goal reached after {} cycles", cycle);
            goal_reached = true;
            break;
        }

        let trajs = Trajectories::arc_fan(
            &state.pose,
            demo.speed_ms,
            &curvatures_m,
            demo.model_dt_s,
            demo.time_steps,
        );
        let mut costs = Array1::zeros(trajs.batch_size());

        let (furthest, num_blocked) = {
            let mut data = CriticData::new(&state, &trajs, &path, &mut costs, demo.model_dt_s);
            critic_manager.eval_trajectories_scores(&mut data);

            (
                data.furthest_reached_path_point,
                data.path_pts_valid
                    .map(|valid| valid.iter().filter(|v| !**v).count())
                    .unwrap_or(0),
            )
        };

        let chosen = cheapest_trajectory(&costs)
            .ok_or_else(|| eyre!("No valid trajectory cost in cycle {}", cycle))?;

        state.pose = Pose2::new(
            trajs.x[[chosen, advance_step]],
            trajs.y[[chosen, advance_step]],
            trajs.yaws[[chosen, advance_step]],
        );
        state.speed = Twist2 {
            linear_ms: demo.speed_ms,
            angular_rads: demo.speed_ms * curvatures_m[chosen],
        };

        let heading_err_rad = furthest
            .and_then(|idx| path.yaws.get(idx))
            .map(|&yaw| shortest_angular_distance(state.pose.heading_rad, yaw))
            .unwrap_or(0.0);

        info!(
            "Cycle {:4}: pose ({:6.2}, {:6.2}, {:5.2}), trajectory {:2} (cost {:.3})",
            cycle,
            state.pose.position_m.x,
            state.pose.position_m.y,
            state.pose.heading_rad,
            chosen,
            costs[chosen]
        );
        debug!(
            "Furthest reached point {:?}, {} blocked path points, heading error {:.3} rad",
            furthest, num_blocked, heading_err_rad
        );

        session.save(
            format!("arch/cycles/cycle_{:04}.json", cycle),
            CycleRecord {
                cycle,
                time_s: session::get_elapsed_seconds(),
                pose: state.pose,
                chosen,
                curvature_m: curvatures_m[chosen],
                furthest_reached_path_point: furthest,
                costs: costs.to_vec(),
            },
        );
    }

    if !goal_reached {
        warn!(
            "Goal not reached within {} cycles, final pose ({:.2}, {:.2})",
            demo.max_cycles, state.pose.position_m.x, state.pose.position_m.y
        );
    }

    session.exit();

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Curvatures spread evenly over `[-max, max]`. A single rollout drives straight.
fn rollout_curvatures(num_rollouts: usize, max_curvature_m: f64) -> Vec<f64> {
    if num_rollouts == 1 {
        vec![0.0]
    } else {
        Array1::linspace(-max_curvature_m, max_curvature_m, num_rollouts).to_vec()
    }
}

/// Index of the first trajectory with the lowest cost, ignoring NaN costs.
fn cheapest_trajectory(costs: &Array1<f64>) -> Option<usize> {
    costs
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &c)| match best {
            Some((_, best_c)) if best_c <= c => best,
            _ => Some((i, c)),
        })
        .map(|(i, _)| i)
}
