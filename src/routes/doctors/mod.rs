pub mod appointments;
pub mod dashboard;
pub mod lab_tests;
pub mod patients;
pub mod prescriptions;

use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    core::{aliases::DieselError, app_error::AppError},
    models::DoctorEntity,
};
use crate::schema::{
    appointments as appointments_tbl, lab_tests as lab_tests_tbl,
    prescriptions as prescriptions_tbl,
};

/// Resolves the doctor row backing an authenticated doctor user.
pub async fn doctor_for_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<DoctorEntity, AppError> {
    crate::schema::doctors::table
        .filter(crate::schema::doctors::user_id.eq(user_id))
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })
}

/// Doctors may only see patients they have a clinical relationship with:
/// a shared appointment, prescription, or lab order.
pub async fn ensure_patient_relationship(
    conn: &mut AsyncPgConnection,
    doctor_id: i32,
    patient_id: i32,
) -> Result<(), AppError> {
    let appointments: i64 = appointments_tbl::table
        .filter(appointments_tbl::doctor_id.eq(doctor_id))
        .filter(appointments_tbl::patient_id.eq(patient_id))
        .count()
        .get_result(conn)
        .await
        .map_err(|err| AppError::Other(err.into()))?;
    if appointments > 0 {
        return Ok(());
    }

    let prescriptions: i64 = prescriptions_tbl::table
        .filter(prescriptions_tbl::doctor_id.eq(doctor_id))
        .filter(prescriptions_tbl::patient_id.eq(patient_id))
        .count()
        .get_result(conn)
        .await
        .map_err(|err| AppError::Other(err.into()))?;
    if prescriptions > 0 {
        return Ok(());
    }

    let lab_tests: i64 = lab_tests_tbl::table
        .filter(lab_tests_tbl::doctor_id.eq(doctor_id))
        .filter(lab_tests_tbl::patient_id.eq(patient_id))
        .count()
        .get_result(conn)
        .await
        .map_err(|err| AppError::Other(err.into()))?;
    if lab_tests > 0 {
        return Ok(());
    }

    Err(AppError::ForbiddenResource(
        "No clinical relationship with this patient".to_string(),
    ))
}
