pub mod clean;
pub mod docs;
pub mod fetch;
pub mod native;
pub mod python;
