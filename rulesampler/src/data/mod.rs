pub mod cover;
pub mod dataset;


pub use cover::Cover;
pub use dataset::Dataset;
