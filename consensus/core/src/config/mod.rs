pub mod constants;
pub mod params;

pub use params::{CollectionParams, CollectionParamsBuilder, MinterKind};
