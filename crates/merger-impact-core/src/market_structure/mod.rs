pub mod analysis;
pub mod breadth;
pub mod concentration;
pub mod fringe;
