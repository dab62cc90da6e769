pub mod admins;
pub mod auth;
pub mod blogs;
pub mod doctors;
pub mod lab;
pub mod notifications;
pub mod nurses;
pub mod patients;
pub mod pharmacists;
