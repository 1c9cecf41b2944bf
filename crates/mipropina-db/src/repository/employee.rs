//! SurrealDB implementation of [`EmployeeRepository`].
//!
//! Every read and write carries `owner_id` in its predicate. An employee
//! id belonging to another owner behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use mipropina_core::error::MiPropinaResult;
use mipropina_core::models::employee::{CreateEmployee, Employee, UpdateEmployee};
use mipropina_core::repository::EmployeeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct EmployeeRow {
    owner_id: String,
    first_name: String,
    last_name: String,
    dni: String,
    phone: String,
    payment_link: String,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmployeeRow {
    fn into_employee(self, id: Uuid) -> Employee {
        Employee {
            id,
            owner_id: self.owner_id,
            first_name: self.first_name,
            last_name: self.last_name,
            dni: self.dni,
            phone: self.phone,
            payment_link: self.payment_link,
            photo_url: self.photo_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct EmployeeRowWithId {
    record_id: String,
    owner_id: String,
    first_name: String,
    last_name: String,
    dni: String,
    phone: String,
    payment_link: String,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmployeeRowWithId {
    fn try_into_employee(self) -> Result<Employee, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid employee UUID: {e}")))?;
        Ok(Employee {
            id,
            owner_id: self.owner_id,
            first_name: self.first_name,
            last_name: self.last_name,
            dni: self.dni,
            phone: self.phone,
            payment_link: self.payment_link,
            photo_url: self.photo_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn not_found(id: &str) -> DbError {
    DbError::NotFound {
        entity: "employee".into(),
        id: id.to_string(),
    }
}

/// SurrealDB implementation of the Employee repository.
#[derive(Clone)]
pub struct SurrealEmployeeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEmployeeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> EmployeeRepository for SurrealEmployeeRepository<C> {
    async fn create(&self, input: CreateEmployee) -> MiPropinaResult<Employee> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('employee', $id) SET \
                 owner_id = $owner_id, \
                 first_name = $first_name, last_name = $last_name, \
                 dni = $dni, phone = $phone, \
                 payment_link = $payment_link, \
                 photo_url = $photo_url",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", input.owner_id))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("dni", input.dni))
            .bind(("phone", input.phone))
            .bind(("payment_link", input.payment_link))
            .bind(("photo_url", input.photo_url))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<EmployeeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(&id_str))?;

        Ok(row.into_employee(id))
    }

    async fn get(&self, owner_id: &str, id: Uuid) -> MiPropinaResult<Employee> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('employee', $id) \
                 WHERE owner_id = $owner_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EmployeeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(&id_str))?;

        Ok(row.into_employee(id))
    }

    async fn list_by_owner(&self, owner_id: &str) -> MiPropinaResult<Vec<Employee>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM employee \
                 WHERE owner_id = $owner_id \
                 ORDER BY created_at DESC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EmployeeRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(EmployeeRowWithId::try_into_employee)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        input: UpdateEmployee,
    ) -> MiPropinaResult<Employee> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('employee', $id) SET \
                 first_name = $first_name, last_name = $last_name, \
                 dni = $dni, phone = $phone, \
                 payment_link = $payment_link, \
                 photo_url = $photo_url, \
                 updated_at = time::now() \
                 WHERE owner_id = $owner_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", owner_id.to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("dni", input.dni))
            .bind(("phone", input.phone))
            .bind(("payment_link", input.payment_link))
            .bind(("photo_url", input.photo_url))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<EmployeeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(&id_str))?;

        Ok(row.into_employee(id))
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> MiPropinaResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "DELETE type::record('employee', $id) \
                 WHERE owner_id = $owner_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<EmployeeRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(&id_str).into());
        }

        Ok(())
    }
}
