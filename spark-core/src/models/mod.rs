pub mod element;
pub mod idea;

pub use element::{Element, ElementMetadata, ElementRow, ElementSource, ElementType};
pub use idea::{Idea, IdeaRow, IdeaStatus};
