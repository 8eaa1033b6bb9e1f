/// Patient model and database operations
///
/// Patients belong to one clinic user. Phone numbers are stored in E.164
/// form (`+55...`) because inbound WhatsApp replies are matched on them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE patients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     phone VARCHAR(20) NOT NULL,
///     email VARCHAR(255),
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use confirmaai_shared::models::patient::{CreatePatient, Patient, PatientFilter};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let patient = Patient::create(&pool, CreatePatient {
///     user_id,
///     name: "Maria Oliveira".to_string(),
///     phone: "+5511999998888".to_string(),
///     email: None,
///     notes: None,
/// }).await?;
///
/// let found = Patient::list_by_user(&pool, user_id, &PatientFilter {
///     search: Some("maria".to_string()),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const PATIENT_COLUMNS: &str =
    "p.id, p.user_id, p.name, p.phone, p.email, p.notes, p.created_at, p.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,

    /// Owning clinic user
    pub user_id: Uuid,

    pub name: String,

    /// `+55` followed by 10 or 11 digits
    pub phone: String,

    pub email: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Patient plus the number of appointments they have (any status)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PatientWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub patient: Patient,

    pub appointment_count: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePatient {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Partial patient update
///
/// `email` and `notes` use `Some(None)` to clear the value.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatient {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// List filter: free-text search plus optional paging
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    /// Matches name or email (case-insensitive) or a fragment of the phone
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const SEARCH_CONDITION: &str = r#"
    p.user_id = $1
    AND (
        $2::text IS NULL
        OR p.name ILIKE '%' || $2 || '%'
        OR p.email ILIKE '%' || $2 || '%'
        OR strpos(p.phone, $2) > 0
    )
"#;

fn search_term(filter: &PatientFilter) -> Option<&str> {
    filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl Patient {
    pub async fn create(pool: &PgPool, data: CreatePatient) -> Result<Self, sqlx::Error> {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (user_id, name, phone, email, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, phone, email, notes, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.name)
        .bind(data.phone)
        .bind(data.email)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(patient)
    }

    /// Finds a patient owned by `user_id`, with their appointment count
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PatientWithCount>, sqlx::Error> {
        let patient = sqlx::query_as::<_, PatientWithCount>(&format!(
            r#"
            SELECT {PATIENT_COLUMNS},
                   (SELECT COUNT(*) FROM appointments a WHERE a.patient_id = p.id) AS appointment_count
            FROM patients p
            WHERE p.id = $1 AND p.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(patient)
    }

    /// True when `id` exists and is owned by `user_id`
    pub async fn belongs_to_user(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM patients WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists the user's patients ordered by name
    ///
    /// Without `limit` every match is returned.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &PatientFilter,
    ) -> Result<Vec<PatientWithCount>, sqlx::Error> {
        let patients = sqlx::query_as::<_, PatientWithCount>(&format!(
            r#"
            SELECT {PATIENT_COLUMNS},
                   (SELECT COUNT(*) FROM appointments a WHERE a.patient_id = p.id) AS appointment_count
            FROM patients p
            WHERE {SEARCH_CONDITION}
            ORDER BY p.name ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(search_term(filter))
        .bind(filter.limit)
        .bind(filter.offset.unwrap_or(0))
        .fetch_all(pool)
        .await?;

        Ok(patients)
    }

    /// Counts the patients `list_by_user` would return without paging
    pub async fn count_by_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &PatientFilter,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM patients p WHERE {SEARCH_CONDITION}"
        ))
        .bind(user_id)
        .bind(search_term(filter))
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Applies a partial update to a patient owned by `user_id`
    ///
    /// Returns `None` when the patient doesn't exist or isn't the user's.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdatePatient,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE patients SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, name, phone, email, notes, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Patient>(&query).bind(id).bind(user_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(notes) = data.notes {
            q = q.bind(notes);
        }

        let patient = q.fetch_optional(pool).await?;

        Ok(patient)
    }

    /// True when the patient has an upcoming appointment that still occupies a slot
    pub async fn has_active_future_appointments(
        pool: &PgPool,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE patient_id = $1
                  AND date_time >= $2
                  AND status NOT IN ('CANCELED', 'NO_SHOW')
            )
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Deletes a patient owned by `user_id`; their appointments cascade
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term_ignores_blank() {
        let mut filter = PatientFilter::default();
        assert_eq!(search_term(&filter), None);

        filter.search = Some("   ".to_string());
        assert_eq!(search_term(&filter), None);

        filter.search = Some(" maria ".to_string());
        assert_eq!(search_term(&filter), Some("maria"));
    }

    #[test]
    fn test_patient_with_count_flattens() {
        let patient = PatientWithCount {
            patient: Patient {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                name: "Maria".to_string(),
                phone: "+5511999998888".to_string(),
                email: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            appointment_count: 3,
        };

        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json["name"], "Maria");
        assert_eq!(json["appointmentCount"], 3);
        assert!(json.get("patient").is_none());
    }
}
