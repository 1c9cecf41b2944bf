//! Employee ("waiter") domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::PrincipalId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    /// Principal id of the tenant that owns this employee.
    pub owner_id: PrincipalId,
    pub first_name: String,
    pub last_name: String,
    /// National identity document number.
    pub dni: String,
    pub phone: String,
    /// Mercado Pago link customers use to tip this employee.
    pub payment_link: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn to_public(&self) -> PublicWaiter {
        let last_initial = self
            .last_name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>());
        let display_name = match &last_initial {
            Some(initial) => format!("{} {initial}.", self.first_name.trim()),
            None => self.first_name.trim().to_string(),
        };
        PublicWaiter {
            id: self.id,
            first_name: self.first_name.clone(),
            last_initial,
            display_name,
            payment_link: self.payment_link.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmployee {
    pub owner_id: PrincipalId,
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub payment_link: String,
    pub photo_url: Option<String>,
}

/// Full replacement of the editable employee fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEmployee {
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub payment_link: String,
    /// `None` clears the photo.
    pub photo_url: Option<String>,
}

/// What customers see on the public store page. The national id and
/// phone never leave the owner surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicWaiter {
    pub id: Uuid,
    pub first_name: String,
    pub last_initial: Option<String>,
    /// e.g. `Juan P.`
    pub display_name: String,
    pub payment_link: String,
    pub photo_url: Option<String>,
}
