pub mod error;
pub mod leave;
pub mod loan;
