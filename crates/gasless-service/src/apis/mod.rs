pub mod authorization;
pub mod domain;
