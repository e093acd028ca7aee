//! # NETMSG Core
//!
//! Wire primitives for the engine's message layer.
//!
//! ## Wire Rules
//!
//! 1. **Little-endian everywhere** - independent of host byte order
//! 2. **Check before write** - a write lands completely or not at all
//! 3. **Check before read** - a read never advances past a short source
//!
//! ## Example
//!
//! ```
//! use netmsg_core::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.write_u8(5).unwrap();
//! writer.write_i32(-1).unwrap();
//! writer.write_f32(3.5).unwrap();
//!
//! let bytes = writer.into_vec();
//! let mut reader = Reader::new(&bytes);
//! assert_eq!(reader.read_u8().unwrap(), 5);
//! assert_eq!(reader.read_i32().unwrap(), -1);
//! assert_eq!(reader.read_f32().unwrap(), 3.5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod byteorder;
pub mod error;
pub mod fixed;
pub mod pool;
pub mod queue;
pub mod reader;
pub mod writer;

pub use byteorder::Primitive;
pub use error::{CodecError, CodecResult};
pub use fixed::Fixed;
pub use pool::BufferPool;
pub use queue::ByteQueue;
pub use reader::Reader;
pub use writer::Writer;
