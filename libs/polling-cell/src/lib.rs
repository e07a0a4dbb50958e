pub mod poller;

pub use poller::{PollerSettings, QueuePoller};
