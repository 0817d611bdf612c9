pub mod mulberry;

pub use mulberry::Mulberry32;
