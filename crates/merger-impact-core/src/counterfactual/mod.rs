pub mod forecast;
pub mod series;
pub mod vmm;
