//! Operation handlers, grouped by the records they touch.

pub mod mail;
pub mod system;
pub mod users;
