pub type DieselError = diesel::result::Error;
pub type DieselErrorKind = diesel::result::DatabaseErrorKind;
