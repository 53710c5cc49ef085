pub mod describe;
pub mod query;
pub mod set_field;
