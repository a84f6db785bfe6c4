pub mod users;
pub mod works;
