pub mod lifecycle;
pub mod reservation;

pub use lifecycle::AppointmentLifecycleService;
pub use reservation::SlotReservationService;
