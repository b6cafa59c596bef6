mod identity;
mod period;

pub use identity::{assign_identities, calendar_uid, event_identity};
pub use period::{anniversary, period_for, period_for_label};
