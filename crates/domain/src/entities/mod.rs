pub mod fill;
pub mod position;
