pub mod evaluate;
pub mod settings;
