pub mod model;

pub use model::GepConfig;
