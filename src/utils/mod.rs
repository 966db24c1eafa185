pub mod logger;
pub mod path_validator;

pub use logger::Logger;
pub use path_validator::PathValidator;
