//! `piecetable` - piece-table text buffer for editor widgets
//!
//! Stores a document as a chain of pieces over two append-only byte stores,
//! with multi-level undo/redo, batched edits, markers that survive edits,
//! and rune-addressed access over UTF-8 storage.
//!
//! ```
//! use piecetable::{Bias, PieceTable};
//!
//! let table = PieceTable::with_text("hello");
//! let marker = table.create_marker(3, Bias::Forward);
//!
//! table.insert(0, "XX");
//! assert_eq!(table.text(), "XXhello");
//! assert_eq!(table.marker_offset(marker), Some(5));
//!
//! table.undo();
//! assert_eq!(table.text(), "hello");
//! ```

// Crate-level lint configuration
#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation)] // Slot indices fit in u32
#![allow(clippy::cast_possible_wrap)] // Byte lengths fit in i128
#![allow(clippy::module_name_repetitions)] // Allow PieceTable::PieceTableOptions etc
#![allow(clippy::missing_errors_doc)] // Docs WIP
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::option_if_let_else)] // if-let-else is clearer than map_or_else

pub mod diagnostics;
pub mod error;
pub mod history;
pub mod marker;
pub mod piece;
pub mod reader;
pub mod store;
pub mod table;

// Re-export core types at crate root
pub use diagnostics::{LogCallback, LogLevel};
pub use error::{Error, Result};
pub use history::{BatchId, CursorPos};
pub use marker::{Bias, Marker};
pub use piece::{Piece, PieceId, PieceList, PieceRange};
pub use reader::Reader;
pub use store::{ByteStore, Source};
pub use table::{PieceTable, PieceTableOptions};
