//! # Vault Suggest Sectioner
//!
//! Splits notes into sections along a configurable boundary pattern and maps
//! character offsets back to line positions.
//!
//! ## Architecture
//!
//! ```text
//! Raw note text
//!     │
//!     ├──> BoundaryPattern (compiled once, bad patterns fail here)
//!     │
//!     ├──> SectionSplitter → Section[] tiling [0, len)
//!     │
//!     ├──> offset_to_position → Position { line, column: 0, offset }
//!     │
//!     └──> extract_input_rows → InputRow[] (cleaned header/body pairs)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use vault_suggest_sectioner::{offset_to_position, BoundaryPattern, SectionSplitter};
//!
//! let splitter = SectionSplitter::new(BoundaryPattern::new("^## ").unwrap());
//! let text = "A\n## Intro\ntext\n## Setup\nmore";
//!
//! let sections = splitter.split(text);
//! assert_eq!(sections.len(), 3);
//! assert_eq!(offset_to_position(text, sections[2].start).unwrap().line, 4);
//! ```

mod config;
mod error;
mod input;
mod position;
mod splitter;

pub use config::{BoundaryPattern, SectionerConfig, DEFAULT_SECTION_DELIMITER, MAX_INPUT_CHARS};
pub use error::{Result, SectionerError};
pub use input::{clean_text, extract_input_rows, extract_input_rows_with_limit, InputRow};
pub use position::{offset_to_position, section_span};
pub use splitter::SectionSplitter;
