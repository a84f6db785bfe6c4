pub mod creation;
pub mod user_info;
