//! Content hashes of a file version, used to follow code as it moves.
//!
//! - [`LineHashSequence`]: one content hash per physical line, plus the
//!   reverse index from hash to lines.
//! - [`BlockHashSequence`]: one rolling hash per line covering a symmetric
//!   window of neighbouring lines.

pub mod block_hash;
pub mod line_hash;

pub use block_hash::{BlockHashSequence, DEFAULT_HALF_BLOCK_SIZE};
pub use line_hash::{LineHashSequence, hash_line, normalize_line};
