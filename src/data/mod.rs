//! Program catalogue, student profiles, and the matching taxonomy.

pub mod profile;
pub mod programs;
pub mod taxonomy;
