//! A reader and writer for files in the PLY geometry interchange format:
//! header parsing/emission, and a pair of drivers that stream typed element
//! data through per-property callbacks (read) or accept it as a flat value
//! stream (write), uniformly across ascii, binary-little-endian, and
//! binary-big-endian encodings.

pub mod arg;
pub mod byteio;
pub mod encoding;
pub mod error;
pub mod header;
pub mod reader;
pub mod schema;
pub mod types;
pub mod writer;

pub use arg::{ControlFlow, ReadArg};
pub use error::{PlyError, Result};
pub use reader::PlyReader;
pub use schema::{
    Comment, Element, ElementIndex, ObjInfo, Property, PropertyIndex, PropertyKind, Schema,
    StorageMode, Token,
};
pub use types::ScalarKind;
pub use writer::PlyWriter;
