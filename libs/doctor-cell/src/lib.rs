pub mod handlers;
pub mod router;
pub mod models;
pub mod services;
pub mod slot_time;
pub mod state;
pub mod store;

pub use models::*;
pub use services::*;
pub use slot_time::{normalize_time, SlotKey};
pub use state::DoctorState;
pub use store::{
    ClaimOutcome, DoctorStore, InMemoryDoctorStore, ReleaseOutcome, SupabaseDoctorStore,
};
