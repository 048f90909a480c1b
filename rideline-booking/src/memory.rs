use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{PaymentStatus, Registration};
use crate::repository::{ProfileRepository, RegistrationRepository};

/// In-memory registration store for tests and local development. The lock
/// makes `mark_status_if_pending` check-and-set atomic, mirroring the
/// conditional UPDATE of the Postgres implementation.
#[derive(Default)]
pub struct MemoryRegistrationRepository {
    registrations: Mutex<HashMap<Uuid, Registration>>,
}

impl MemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }
}

#[async_trait]
impl RegistrationRepository for MemoryRegistrationRepository {
    async fn create(
        &self,
        registration: &Registration,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        self.registrations
            .lock()
            .unwrap()
            .insert(registration.id, registration.clone());
        Ok(registration.id)
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.registrations.lock().unwrap().get(&id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        let mut result: Vec<Registration> = self
            .registrations
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_by_status(
        &self,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        let mut result: Vec<Registration> = self
            .registrations
            .lock()
            .unwrap()
            .values()
            .filter(|r| status.map_or(true, |s| r.payment.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn set_session(
        &self,
        id: Uuid,
        session_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut registrations = self.registrations.lock().unwrap();
        match registrations.get_mut(&id) {
            Some(registration) => {
                registration.session_id = Some(session_id.to_string());
                Ok(())
            }
            None => Err(format!("registration not found: {id}").into()),
        }
    }

    async fn mark_status_if_pending(
        &self,
        id: Uuid,
        next: PaymentStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut registrations = self.registrations.lock().unwrap();
        match registrations.get_mut(&id) {
            Some(registration)
                if registration.payment.status == PaymentStatus::Pending
                    && PaymentStatus::Pending.can_transition(next) =>
            {
                registration.payment.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.registrations.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// In-memory rider-profile store.
#[derive(Default)]
pub struct MemoryProfileRepository {
    profiles: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn save_fields(
        &self,
        owner_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut profiles = self.profiles.lock().unwrap();
        let entry = profiles
            .entry(owner_id.to_string())
            .or_insert_with(|| serde_json::json!({}));
        if let (Some(existing), Some(incoming)) = (entry.as_object_mut(), fields.as_object()) {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn get_fields(
        &self,
        owner_id: &str,
    ) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.profiles.lock().unwrap().get(owner_id).cloned())
    }
}
