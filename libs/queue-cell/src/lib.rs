pub mod display;
pub mod models;
pub mod normalize;
pub mod reconcile;

pub use display::{anonymize, project, DisplayOptions, DisplayState, NowServing, UpcomingEntry};
pub use models::*;
pub use normalize::{normalize, normalize_current_token, normalize_list};
pub use reconcile::{compute_stats, move_in_queue, reconcile, search, MoveDirection};
