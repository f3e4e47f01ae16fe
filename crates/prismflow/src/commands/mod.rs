pub mod action;
pub mod delete;
pub mod launch;
pub mod recovery_point;
pub mod runbook;
pub mod tables;
pub mod wait;
