//! Index module - passage metadata, embedding storage and the index store

mod embeddings;
mod meta;
mod passages;
mod store;

pub use embeddings::{write_matrix, EmbeddingsStore};
pub use meta::IndexMeta;
pub use passages::Passage;
pub use store::{IndexStore, LoadedIndex};
