use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// Users

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub status: String,
    #[serde(skip_serializing)]
    pub session_token: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
}

// User profiles

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::user_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserProfileEntity {
    pub user_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct CreateUserProfileEntity {
    pub user_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct UpdateUserProfileEntity {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

// Patients

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatientEntity {
    pub id: i32,
    pub user_id: i32,
    pub medical_record_number: String,
    pub blood_type: Option<String>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::patients)]
pub struct CreatePatientEntity {
    pub user_id: i32,
    pub medical_record_number: String,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
pub struct UpdatePatientEntity {
    pub blood_type: Option<String>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

// Doctors

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::doctors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DoctorEntity {
    pub id: i32,
    pub user_id: i32,
    pub specialization: String,
    pub department: String,
    pub license_number: String,
    pub consultation_fee: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::doctors)]
pub struct CreateDoctorEntity {
    pub user_id: i32,
    pub specialization: String,
    pub department: String,
    pub license_number: String,
    pub consultation_fee: f32,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::doctors)]
pub struct UpdateDoctorEntity {
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub license_number: Option<String>,
    pub consultation_fee: Option<f32>,
}

// Appointments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AppointmentEntity {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::appointments)]
pub struct CreateAppointmentEntity {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub reason: Option<String>,
}

// Prescriptions

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::prescriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PrescriptionEntity {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub instructions: String,
    pub status: String,
    pub filled_by: Option<i32>,
    pub filled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::prescriptions)]
pub struct CreatePrescriptionEntity {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub instructions: String,
    pub status: String,
}

// Medications

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::medications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicationEntity {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub unit_price: f32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::medications)]
pub struct CreateMedicationEntity {
    pub name: String,
    pub category: String,
    pub unit_price: f32,
    pub description: Option<String>,
}

// Inventory

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::inventory)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryEntity {
    pub id: i32,
    pub medication_id: i32,
    pub quantity_available: i32,
    pub minimum_stock_level: i32,
    pub expiry_date: NaiveDate,
    pub batch_number: String,
    pub supplier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::inventory)]
pub struct CreateInventoryEntity {
    pub medication_id: i32,
    pub quantity_available: i32,
    pub minimum_stock_level: i32,
    pub expiry_date: NaiveDate,
    pub batch_number: String,
    pub supplier: String,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::inventory)]
pub struct UpdateInventoryEntity {
    pub quantity_available: Option<i32>,
    pub minimum_stock_level: Option<i32>,
    pub expiry_date: Option<NaiveDate>,
    pub batch_number: Option<String>,
    pub supplier: Option<String>,
}

// Lab tests

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::lab_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LabTestEntity {
    pub id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub test_name: String,
    pub test_type: String,
    pub status: String,
    pub results: Option<Value>,
    pub completed_by: Option<i32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::lab_tests)]
pub struct CreateLabTestEntity {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub test_name: String,
    pub test_type: String,
    pub status: String,
}

// Notifications

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationEntity {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub related_id: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::notifications)]
pub struct CreateNotificationEntity {
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub related_id: Option<i32>,
}

// Blogs

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::blogs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlogEntity {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::blogs)]
pub struct CreateBlogEntity {
    pub author_id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::blogs)]
pub struct UpdateBlogEntity {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

// Medical documents

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::medical_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicalDocumentEntity {
    pub id: i32,
    pub patient_id: i32,
    pub file_name: String,
    pub content_type: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::medical_documents)]
pub struct CreateMedicalDocumentEntity {
    pub patient_id: i32,
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // A PATCH body naming one field must not touch the others: absent keys
    // deserialize to None and None fields are skipped by the changeset.
    #[test]
    fn partial_inventory_update_only_carries_supplied_fields() {
        let changes: UpdateInventoryEntity =
            serde_json::from_str(r#"{"quantity_available": 5}"#).unwrap();
        assert_eq!(changes.quantity_available, Some(5));
        assert_eq!(changes.minimum_stock_level, None);
        assert_eq!(changes.expiry_date, None);
        assert_eq!(changes.batch_number, None);
        assert_eq!(changes.supplier, None);
    }

    #[test]
    fn empty_update_body_is_all_none() {
        let changes: UpdateInventoryEntity = serde_json::from_str("{}").unwrap();
        assert!(changes.quantity_available.is_none());
        assert!(changes.batch_number.is_none());

        let changes: UpdateBlogEntity = serde_json::from_str("{}").unwrap();
        assert!(changes.title.is_none());
        assert!(changes.status.is_none());
    }
}
