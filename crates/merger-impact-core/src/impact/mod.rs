pub mod pass_through;
pub mod welfare;
