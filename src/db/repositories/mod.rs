mod availability_repository;
mod job_repository;
mod reschedule_repository;
mod schedule_repository;

pub use availability_repository::AvailabilityRepository;
pub use job_repository::JobRepository;
pub use reschedule_repository::RescheduleRepository;
pub use schedule_repository::ScheduleRepository;
