pub mod blogs;
pub mod doctors;
pub mod users;
