pub mod calendar;
pub mod crm;
pub mod mission;
pub mod package;
pub mod project;
pub mod quote;
pub mod session;
