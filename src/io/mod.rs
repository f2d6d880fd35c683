pub mod atomic;
pub mod csv;
pub mod results;
