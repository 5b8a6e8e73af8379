pub mod health;
pub mod lists;
pub mod metrics;
pub mod movies;
