pub mod catalog;
pub mod features;
pub mod market;
