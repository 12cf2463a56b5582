pub mod any_date;
pub mod data_kind;
pub mod horizon;
pub mod target;
