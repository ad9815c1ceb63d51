use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::Patient;

const PUBLIC_COLUMNS: &str = "id,name,email,phone,image,address,gender,dob";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<Patient>>;
}

pub struct SupabaseUserStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseUserStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl UserStore for SupabaseUserStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<Patient>> {
        debug!("Fetching user snapshot: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}&select={}", user_id, PUBLIC_COLUMNS);
        let mut rows: Vec<Patient> = self.supabase.select(&path).await?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = Patient>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    pub async fn insert(&self, user: Patient) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<Patient>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}
