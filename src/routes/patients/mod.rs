pub mod appointments;
pub mod documents;
pub mod profile;
pub mod records;

use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    core::{aliases::DieselError, app_error::AppError},
    models::PatientEntity,
    schema::patients,
};

/// Resolves the patient row backing an authenticated patient user.
pub async fn patient_for_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<PatientEntity, AppError> {
    patients::table
        .filter(patients::user_id.eq(user_id))
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })
}
