pub mod leave;
pub mod loan;
pub mod role;
pub mod staff;
pub mod status;
