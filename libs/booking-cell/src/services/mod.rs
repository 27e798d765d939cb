pub mod booking;
pub mod lifecycle;
pub mod locking;

pub use booking::SessionBookingService;
pub use lifecycle::{SessionLifecycleService, TransitionOutcome};
pub use locking::SchedulingLockService;
