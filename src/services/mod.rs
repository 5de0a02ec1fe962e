mod automation;
mod availability_service;
mod clock;
mod notifier;

pub use automation::AutomationScheduler;
pub use availability_service::{AvailabilityService, CalendarView, CalendarViewType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{DispatchError, LoggingNotifier, Notifier, RecordingNotifier};
