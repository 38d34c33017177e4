pub mod calendar;
pub mod enrollments;
pub mod reports;
pub mod resits;
pub mod status;
