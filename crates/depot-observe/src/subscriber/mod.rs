mod journal;
pub use journal::Journal;

mod view;
pub use view::{View, log_progress, message_for};
