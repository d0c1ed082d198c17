pub mod cache;
pub mod deps;
pub mod encode;
pub mod version;
