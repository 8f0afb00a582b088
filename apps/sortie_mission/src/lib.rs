pub mod driver;
pub mod mission;

pub use driver::{run_mission, DriverOptions, MissionReport, StepReport, StepResult};
pub use mission::{read_mission, Mission, MoveStep, Step};
