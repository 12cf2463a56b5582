pub mod error;
pub mod filtering;
pub mod io;
pub mod schema;
