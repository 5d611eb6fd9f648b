pub mod apply;
pub mod purge;
pub mod status;
