pub mod action_log;
pub mod actuator;
pub mod environmental;
pub mod forecast;
pub mod greenhouse;
pub mod plan;
pub mod plant_profile;

pub use action_log::*;
pub use actuator::*;
pub use environmental::*;
pub use forecast::*;
pub use greenhouse::*;
pub use plan::*;
pub use plant_profile::*;
