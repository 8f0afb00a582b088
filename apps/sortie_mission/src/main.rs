use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use sortie_helpers::{basic_sortie_setup, level_from_verbosity};
use sortie_mission::{read_mission, run_mission, DriverOptions, MissionReport, StepResult};
use sortie_payloads::ActionKind;
use sortie_runtime::config::{read_configuration, FlightConfig};
use sortie_runtime::flight::FlightController;
use sortie_sim_vehicle::{SimFault, SimSettings, SimVehicle};
use sortie_traits::{SortieError, SortieResult};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Mission to fly (RON), e.g. apps/sortie_mission/missions/triangle.ron.
    #[arg(long)]
    mission: PathBuf,

    /// Flight configuration (RON). Built-in timeouts are used without it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// -v for debug, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Wait for Enter before taking off.
    #[arg(long)]
    interactive: bool,

    /// Vehicle to connect to, overrides the one named in the mission.
    #[arg(long, env = "DRONE_NAME")]
    vehicle: Option<String>,

    /// Simulated time to GPS lock after connecting.
    #[arg(long, default_value_t = 3000)]
    fix_delay_ms: u64,

    /// Faults to inject in the simulated vehicle, comma-separated.
    #[arg(long, value_enum, value_delimiter = ',')]
    fault: Vec<Fault>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Fault {
    NoFix,
    StallTakeoff,
    StallLand,
    StallMove,
    StallGimbal,
    RefuseTakeoff,
    RefuseLand,
    DropLink,
}

impl From<Fault> for SimFault {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::NoFix => SimFault::NoFix,
            Fault::StallTakeoff => SimFault::Stall(ActionKind::TakeOff),
            Fault::StallLand => SimFault::Stall(ActionKind::Land),
            Fault::StallMove => SimFault::Stall(ActionKind::MoveBy),
            Fault::StallGimbal => SimFault::Stall(ActionKind::GimbalSetPitch),
            Fault::RefuseTakeoff => SimFault::Refuse(ActionKind::TakeOff),
            Fault::RefuseLand => SimFault::Refuse(ActionKind::Land),
            Fault::DropLink => SimFault::DropLinkOn(ActionKind::MoveBy),
        }
    }
}

fn wait_for_enter(prompt: &str) -> SortieResult<()> {
    print!("{} ", prompt);
    io::stdout()
        .flush()
        .map_err(|e| SortieError::new_with_cause("Failed to write to stdout", e))?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| SortieError::new_with_cause("Failed to read from stdin", e))?;
    Ok(())
}

fn summarize(report: &MissionReport) {
    for step in &report.steps {
        match &step.result {
            StepResult::Done => info!("Step {}: done", step.index + 1),
            StepResult::Failed(e) => warn!("Step {}: {}", step.index + 1, e),
            StepResult::Skipped => warn!("Step {}: skipped", step.index + 1),
        }
    }
    if let Some(Err(e)) = &report.landing {
        error!("Landing: {}", e);
    }
    if report.emergency {
        error!("Motors were cut during the mission");
    }
    match report.final_state {
        Some(state) => info!("Vehicle is {}", state),
        None => warn!("Vehicle state unknown"),
    }
}

fn fly(args: &Args) -> SortieResult<MissionReport> {
    let mission = read_mission(&args.mission)?;
    let config = match &args.config {
        Some(path) => read_configuration(path)?,
        None => FlightConfig::default(),
    };
    let name = args
        .vehicle
        .clone()
        .unwrap_or_else(|| mission.vehicle.to_string());
    let mut settings = SimSettings {
        fix_delay: Duration::from_millis(args.fix_delay_ms),
        ..SimSettings::default()
    };
    settings.faults = args.fault.iter().map(|f| SimFault::from(*f)).collect();

    let vehicle = SimVehicle::new(name, settings);
    let mut controller = FlightController::connect(vehicle, config)?;
    let options = DriverOptions {
        interactive: args.interactive,
    };
    let report = run_mission(&mut controller, &mission, &options, wait_for_enter)?;
    controller.close()?;
    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = basic_sortie_setup(
        args.log_file.as_deref(),
        level_from_verbosity(args.verbose),
        true,
    ) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match fly(&args) {
        Ok(report) => {
            summarize(&report);
            if report.succeeded() {
                info!("Mission complete");
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
