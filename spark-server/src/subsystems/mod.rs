pub mod elements;
pub mod ideas;
pub mod link_preview;
pub mod mini_spark;
pub mod scouts;
pub mod spark;
