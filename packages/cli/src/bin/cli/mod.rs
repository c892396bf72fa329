pub mod seed;
pub mod settings;
