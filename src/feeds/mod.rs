pub mod bootstrap;
pub mod controls;
pub mod ticker;
