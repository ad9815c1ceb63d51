use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Public patient data as it is copied into an appointment at booking time.
/// Credentials never leave the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub address: Value,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
}

impl Patient {
    pub fn new(id: Uuid, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            image: None,
            address: Value::Null,
            gender: None,
            dob: None,
        }
    }
}
