pub mod codec;
pub mod commands;
pub mod filter;
pub mod index;
pub mod library;
pub mod mutation;
pub mod resolve;
pub mod types;

pub use library::{TagLibrary, TagLibraryStore};
pub use mutation::{MutationOutcome, MutationState};
pub use types::{FileItem, LibraryTag, Tag, TagGroup, TagIndex, TemporaryTag};
