pub mod conditions;
pub mod controller;
pub mod machine;
pub mod phase;
pub mod recorder;
pub mod tab_tracker;

pub use conditions::{assign_conditions, ConditionShuffler, FixedOrder, RandomShuffler};
pub use controller::SessionController;
pub use machine::Session;
pub use phase::{Effect, Event, Phase};
pub use recorder::{AttemptRecorder, NewAttempt};
pub use tab_tracker::{Direction, TabSwitch, TabTracker};
