mod common;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::future::join_all;
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentGuard, AppointmentLifecycleService, AppointmentPatch, AppointmentStore,
    ConditionalUpdate, InMemoryAppointmentStore, Requester, SlotReservationService,
};
use doctor_cell::{
    BookedSlots, ClaimOutcome, Doctor, DoctorProfile, DoctorStore, InMemoryDoctorStore, ReleaseOutcome,
};
use shared_models::error::ServiceError;

use common::Fixture;

// ==============================================================================
// TEST DOUBLES
// ==============================================================================

/// Disables the doctor between the availability check and the claim.
struct FlipBeforeClaim {
    inner: InMemoryDoctorStore,
}

#[async_trait]
impl DoctorStore for FlipBeforeClaim {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        self.inner.find_doctor(doctor_id).await
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>> {
        self.inner.list_doctors().await
    }

    async fn claim_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ClaimOutcome> {
        self.inner.set_availability(doctor_id, false).await?;
        self.inner.claim_slot(doctor_id, slot_date, slot_time).await
    }

    async fn release_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ReleaseOutcome> {
        self.inner.release_slot(doctor_id, slot_date, slot_time).await
    }

    async fn set_availability(&self, doctor_id: Uuid, available: bool) -> Result<Option<DoctorProfile>> {
        self.inner.set_availability(doctor_id, available).await
    }
}

/// Rejects every insert.
struct RejectingAppointments {
    inner: InMemoryAppointmentStore,
}

#[async_trait]
impl AppointmentStore for RejectingAppointments {
    async fn create_appointment(&self, _appointment: &Appointment) -> Result<Appointment> {
        Err(anyhow!("insert rejected"))
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        self.inner.find_appointment(appointment_id).await
    }

    async fn active_for_doctor_on(&self, doctor_id: Uuid, slot_date: &str) -> Result<Vec<Appointment>> {
        self.inner.active_for_doctor_on(doctor_id, slot_date).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>> {
        self.inner.list_for_user(user_id).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        self.inner.list_for_doctor(doctor_id).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        self.inner.list_all().await
    }

    async fn update_if(
        &self,
        appointment_id: Uuid,
        guard: AppointmentGuard,
        patch: &AppointmentPatch,
    ) -> Result<ConditionalUpdate> {
        self.inner.update_if(appointment_id, guard, patch).await
    }
}

async fn booked_times(doctors: &dyn DoctorStore, doctor_id: Uuid, slot_date: &str) -> Vec<String> {
    doctors
        .find_doctor(doctor_id)
        .await
        .unwrap()
        .unwrap()
        .slots_booked
        .times_on(slot_date)
        .to_vec()
}

// ==============================================================================
// RESERVE
// ==============================================================================

#[tokio::test]
async fn test_reserve_books_slot_and_snapshots() {
    let fixture = Fixture::new();

    let appointment = fixture
        .service()
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await
        .unwrap();

    assert_eq!(appointment.user_id, fixture.patient_id);
    assert_eq!(appointment.doc_id, fixture.doctor_id);
    assert_eq!(appointment.amount, 50.0);
    assert_eq!(appointment.user_data.name, "Ana Gomez");
    assert_eq!(appointment.doc_data.name, "Dr. Richard James");
    assert!(!appointment.cancelled && !appointment.payment);

    assert_eq!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await, vec!["10:00 AM"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_book_slot_once() {
    let fixture = Fixture::new();
    let mut patients = Vec::new();
    for i in 0..20 {
        patients.push(fixture.add_patient(&format!("Patient{}", i)).await);
    }
    let service = Arc::new(fixture.service());

    let attempts = patients.into_iter().map(|patient_id| {
        let service = service.clone();
        let request = fixture.request("5_6_2024", "11:30 AM");
        tokio::spawn(async move { service.reserve(patient_id, request).await })
    });

    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(ServiceError::SlotTaken));
    }

    let active = fixture
        .appointments
        .active_for_doctor_on(fixture.doctor_id, "5_6_2024")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.len(), 1);
}

#[tokio::test]
async fn test_availability_flip_before_claim_books_nothing() {
    let fixture = Fixture::new();
    let doctor = fixture.doctors.find_doctor(fixture.doctor_id).await.unwrap().unwrap();
    let doctors = Arc::new(FlipBeforeClaim {
        inner: InMemoryDoctorStore::with_doctors([doctor]),
    });
    let service = SlotReservationService::new(doctors.clone(), fixture.appointments.clone(), fixture.users.clone());

    let result = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await;

    assert_matches!(result, Err(ServiceError::DoctorUnavailable));
    assert!(booked_times(doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.is_empty());
    assert!(fixture.appointments.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_and_unknown_doctor() {
    let fixture = Fixture::new();
    fixture.doctors.set_availability(fixture.doctor_id, false).await.unwrap();

    let result = fixture
        .service()
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await;
    assert_matches!(result, Err(ServiceError::DoctorUnavailable));

    let mut request = fixture.request("5_6_2024", "10:00 AM");
    request.doc_id = Some(Uuid::new_v4().to_string());
    let result = fixture.service().reserve(fixture.patient_id, request).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_equivalent_time_spelling_is_taken() {
    let fixture = Fixture::new();
    let mut doctor = fixture.doctors.find_doctor(fixture.doctor_id).await.unwrap().unwrap();
    doctor.slots_booked = BookedSlots::from([("5_6_2024", &["09:00 am"][..])]);
    fixture.doctors.insert(doctor).await;

    let result = fixture
        .service()
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "9:00 AM"))
        .await;

    assert_matches!(result, Err(ServiceError::SlotTaken));
}

#[tokio::test]
async fn test_neighbouring_slot_is_still_free() {
    let fixture = Fixture::new();
    let mut doctor = fixture.doctors.find_doctor(fixture.doctor_id).await.unwrap().unwrap();
    doctor.slots_booked = BookedSlots::from([("5_6_2024", &["10:00 AM"][..])]);
    fixture.doctors.insert(doctor).await;
    let service = fixture.service();

    let taken = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await;
    assert_matches!(taken, Err(ServiceError::SlotTaken));

    service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:30 AM"))
        .await
        .unwrap();

    assert_eq!(
        booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await,
        vec!["10:00 AM", "10:30 AM"]
    );
}

#[tokio::test]
async fn test_missing_user_releases_claimed_slot() {
    let fixture = Fixture::new();

    let result = fixture
        .service()
        .reserve(Uuid::new_v4(), fixture.request("5_6_2024", "10:00 AM"))
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(what)) if what == "User");
    assert!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.is_empty());
}

#[tokio::test]
async fn test_failed_insert_releases_claimed_slot() {
    let fixture = Fixture::new();
    let appointments = Arc::new(RejectingAppointments {
        inner: InMemoryAppointmentStore::new(),
    });
    let service = SlotReservationService::new(fixture.doctors.clone(), appointments, fixture.users.clone());

    let result = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await;

    assert_matches!(result, Err(ServiceError::Store(_)));
    assert!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.is_empty());
}

// ==============================================================================
// CANCEL
// ==============================================================================

#[tokio::test]
async fn test_cancel_releases_slot_for_rebooking() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let first = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await
        .unwrap();

    let cancelled = service
        .cancel(first.id, &Requester::Patient(fixture.patient_id))
        .await
        .unwrap();
    assert!(cancelled.cancelled);
    assert!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.is_empty());

    let other = fixture.add_patient("Bruno").await;
    service
        .reserve(other, fixture.request("5_6_2024", "10:00 am"))
        .await
        .unwrap();

    // A repeated cancel of the old booking must not free the new one.
    let again = service
        .cancel(first.id, &Requester::Patient(fixture.patient_id))
        .await
        .unwrap();
    assert!(again.cancelled);
    assert_eq!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await, vec!["10:00 am"]);
}

#[tokio::test]
async fn test_cancel_by_stranger_changes_nothing() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let appointment = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await
        .unwrap();

    let result = service
        .cancel(appointment.id, &Requester::Patient(Uuid::new_v4()))
        .await;
    assert_matches!(result, Err(ServiceError::Unauthorized(_)));

    let result = service.cancel(appointment.id, &Requester::Doctor(Uuid::new_v4())).await;
    assert_matches!(result, Err(ServiceError::Unauthorized(_)));

    let stored = fixture.appointments.find_appointment(appointment.id).await.unwrap().unwrap();
    assert!(!stored.cancelled);
    assert_eq!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await, vec!["10:00 AM"]);
}

#[tokio::test]
async fn test_doctor_and_admin_may_cancel() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let first = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await
        .unwrap();
    let second = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "11:00 AM"))
        .await
        .unwrap();

    service.cancel(first.id, &Requester::Doctor(fixture.doctor_id)).await.unwrap();
    service.cancel(second.id, &Requester::Admin).await.unwrap();

    assert!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await.is_empty());
    assert_matches!(
        service.cancel(Uuid::new_v4(), &Requester::Admin).await,
        Err(ServiceError::NotFound(_))
    );
}

// ==============================================================================
// COMPLETE AND LISTINGS
// ==============================================================================

#[tokio::test]
async fn test_complete_requires_treating_doctor_and_live_appointment() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let lifecycle = AppointmentLifecycleService::new(fixture.appointments.clone());
    let appointment = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM"))
        .await
        .unwrap();

    assert_matches!(
        lifecycle.complete(appointment.id, &Requester::Patient(fixture.patient_id)).await,
        Err(ServiceError::Unauthorized(_))
    );

    let completed = lifecycle
        .complete(appointment.id, &Requester::Doctor(fixture.doctor_id))
        .await
        .unwrap();
    assert!(completed.is_completed);
    assert_eq!(booked_times(fixture.doctors.as_ref(), fixture.doctor_id, "5_6_2024").await, vec!["10:00 AM"]);

    // Completing twice is harmless.
    lifecycle
        .complete(appointment.id, &Requester::Doctor(fixture.doctor_id))
        .await
        .unwrap();

    let other = service
        .reserve(fixture.patient_id, fixture.request("5_6_2024", "11:00 AM"))
        .await
        .unwrap();
    service.cancel(other.id, &Requester::Admin).await.unwrap();
    assert_matches!(
        lifecycle.complete(other.id, &Requester::Admin).await,
        Err(ServiceError::Cancelled)
    );
}

#[tokio::test]
async fn test_listings_are_scoped_to_requester() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let lifecycle = AppointmentLifecycleService::new(fixture.appointments.clone());
    let other = fixture.add_patient("Bruno").await;

    service.reserve(fixture.patient_id, fixture.request("5_6_2024", "10:00 AM")).await.unwrap();
    let paid = service.reserve(other, fixture.request("5_6_2024", "10:30 AM")).await.unwrap();
    fixture
        .appointments
        .update_if(paid.id, AppointmentGuard::active_unpaid(), &AppointmentPatch::mark_paid("pi_1", chrono::Utc::now()))
        .await
        .unwrap();

    assert_eq!(lifecycle.list_for_user(fixture.patient_id).await.unwrap().len(), 1);
    assert_eq!(lifecycle.list_for_doctor(&Requester::Doctor(fixture.doctor_id)).await.unwrap().len(), 2);
    assert_matches!(
        lifecycle.list_for_doctor(&Requester::Patient(fixture.patient_id)).await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_matches!(
        lifecycle.list_all(&Requester::Doctor(fixture.doctor_id)).await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_eq!(lifecycle.list_all(&Requester::Admin).await.unwrap().len(), 2);

    let dashboard = lifecycle
        .doctor_dashboard(&Requester::Doctor(fixture.doctor_id))
        .await
        .unwrap();
    assert_eq!(dashboard.earnings, 50.0);
    assert_eq!(dashboard.appointments, 2);
    assert_eq!(dashboard.patients, 2);
}
