mod availability_block;
mod job;
mod notification;
mod recurrence;
mod reschedule_request;
mod schedule_reservation;
mod time_range;

#[allow(unused)]
pub use availability_block::*;
#[allow(unused)]
pub use job::*;
#[allow(unused)]
pub use notification::*;
#[allow(unused)]
pub use recurrence::*;
#[allow(unused)]
pub use reschedule_request::*;
#[allow(unused)]
pub use schedule_reservation::*;
#[allow(unused)]
pub use time_range::*;
