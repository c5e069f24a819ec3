use crowd_nav::adapters::inbound::load_request;
use crowd_nav::adapters::outbound::{init_buffered_logger, init_combined_logger, init_console_logger};
use crowd_nav::application::NavigationService;
use crowd_nav::domains::logger::DynLogger;
use crowd_nav::domains::navigation::{NavigationRequest, StampedPose};
use crowd_nav::Config;
use rand::Rng;
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .cloned()
}

fn build_logger(config: &Config) -> DynLogger {
    let logger = match &config.logging.file {
        Some(path) => init_combined_logger(path),
        None => init_console_logger(),
    };
    if config.logging.buffered {
        init_buffered_logger(logger, 1024)
    } else {
        logger
    }
}

/// Scatters agents over the inner part of the costmap with random start and goal poses.
fn random_request(config: &Config, agents: u64) -> NavigationRequest {
    let costmap = &config.costmap;
    let extent_x = costmap.width as f64 * costmap.resolution;
    let extent_y = costmap.height as f64 * costmap.resolution;
    let mut rng = rand::thread_rng();
    let random_pose = |rng: &mut rand::rngs::ThreadRng| {
        StampedPose::planar(
            costmap.global_frame.clone(),
            costmap.origin_x + rng.gen_range(0.1..0.9) * extent_x,
            costmap.origin_y + rng.gen_range(0.1..0.9) * extent_y,
            rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
        )
    };

    let mut request = NavigationRequest::new();
    for agent_id in 0..agents {
        let start = random_pose(&mut rng);
        let goal = random_pose(&mut rng);
        request = request.with_agent(agent_id, start, goal);
    }
    request
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crowd_nav=info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = arg_value(&args, "--config").map(PathBuf::from);
    let request_path = arg_value(&args, "--request").map(PathBuf::from);
    let agents = arg_value(&args, "--agents")
        .and_then(|value| value.parse().ok())
        .unwrap_or(3);

    let config = Config::load(config_path.as_deref())?;
    config.validate()?;
    info!(
        planner = %config.navigation.planner,
        controller = %config.navigation.controller,
        control_period_ms = config.navigation.control_period_ms,
        "Configuration loaded"
    );

    let logger = build_logger(&config);
    let service = NavigationService::from_config(&config, logger)?;

    let request = match request_path {
        Some(path) => load_request(&path).await?,
        None => random_request(&config, agents),
    };

    let mut handle = service.submit(request).await?;
    info!(episode = %handle.id, "Episode accepted");

    let mut feedback_open = true;
    loop {
        tokio::select! {
            feedback = handle.feedback.recv(), if feedback_open => match feedback {
                Some(feedback) => {
                    for (agent_id, pose) in &feedback.poses {
                        info!(agent = %agent_id, x = pose.position.x, y = pose.position.y, "Agent position");
                    }
                }
                None => feedback_open = false,
            },
            outcome = &mut handle.outcome => {
                match outcome {
                    Ok(outcome) => info!(?outcome, "Episode finished"),
                    Err(_) => error!("Navigation service stopped before the episode finished"),
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling the episode");
                service.cancel().await?;
            }
        }
    }

    service.shutdown().await?;
    info!("Shut down");
    Ok(())
}
