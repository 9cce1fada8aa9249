// src/io/mod.rs
pub mod archive;
pub mod reader;
pub mod writer;

pub use archive::LocalArchive;
pub use reader::read_scene;
pub use writer::{write_index, WriteOptions};
