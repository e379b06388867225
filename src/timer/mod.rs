pub mod state;
pub mod ticker;

pub use state::{BlockTimer, Tick, TimerStatus};
pub use ticker::Ticker;
