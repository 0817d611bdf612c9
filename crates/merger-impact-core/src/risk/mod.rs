pub mod assessment;
pub mod classifier;
pub mod policy;
