pub mod constraints;
pub mod data;
pub mod lines;
pub mod season;
pub mod selection;
pub mod session;
pub mod submission;
pub mod summary;
