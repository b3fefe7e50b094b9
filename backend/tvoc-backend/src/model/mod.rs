//! Pure game logic, independent of the database and the web layer.

pub mod arrange;
pub mod quiz;
pub mod scoring;
