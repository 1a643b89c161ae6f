//! Fixed stage instruction templates and industry profiles

pub mod industry;
pub mod templates;

pub use industry::{IndustryBenchmarks, IndustryProfile, profile_for};
pub use templates::system_template;
