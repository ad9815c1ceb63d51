use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use appointment_cell::{Appointment, AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use doctor_cell::{Doctor, DoctorStore, InMemoryDoctorStore, SupabaseDoctorStore};
use patient_cell::{InMemoryUserStore, Patient, SupabaseUserStore, UserStore};
use shared_config::{AppConfig, StoreBackend};
use shared_database::SupabaseClient;

/// Store handles shared by every cell router.
#[derive(Clone)]
pub struct Stores {
    pub doctors: Arc<dyn DoctorStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub users: Arc<dyn UserStore>,
}

/// Contents of `MEMORY_SEED_PATH`. Every collection is optional.
#[derive(Debug, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub users: Vec<Patient>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl MemorySeed {
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading memory seed {}", path))?;
        let mut seed: MemorySeed = serde_json::from_str(&raw)
            .with_context(|| format!("parsing memory seed {}", path))?;
        seed.mirror_active_slots();
        Ok(seed)
    }

    /// Every non-cancelled appointment holds its slot in the doctor's booked map.
    fn mirror_active_slots(&mut self) {
        for appointment in self.appointments.iter().filter(|a| !a.cancelled) {
            match self.doctors.iter_mut().find(|d| d.id() == appointment.doc_id) {
                Some(doctor) => {
                    doctor
                        .slots_booked
                        .claim(&appointment.slot_date, &appointment.slot_time);
                }
                None => warn!(
                    "Seeded appointment {} references unknown doctor {}",
                    appointment.id, appointment.doc_id
                ),
            }
        }
    }
}

impl Stores {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase store backend at {}", config.supabase_url);
                let supabase = Arc::new(SupabaseClient::new(config));
                Ok(Self {
                    doctors: Arc::new(SupabaseDoctorStore::new(supabase.clone())),
                    appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                    users: Arc::new(SupabaseUserStore::new(supabase)),
                })
            }
            StoreBackend::Memory => {
                let seed = match config.memory_seed_path.as_deref() {
                    Some(path) => MemorySeed::load(path)?,
                    None => {
                        warn!("MEMORY_SEED_PATH not set, starting with empty stores");
                        MemorySeed::default()
                    }
                };
                info!(
                    doctors = seed.doctors.len(),
                    users = seed.users.len(),
                    appointments = seed.appointments.len(),
                    "Using in-memory store backend"
                );
                Ok(Self::in_memory(seed))
            }
        }
    }

    pub fn in_memory(seed: MemorySeed) -> Self {
        Self {
            doctors: Arc::new(InMemoryDoctorStore::with_doctors(seed.doctors)),
            appointments: Arc::new(InMemoryAppointmentStore::with_appointments(seed.appointments)),
            users: Arc::new(InMemoryUserStore::with_users(seed.users)),
        }
    }
}
