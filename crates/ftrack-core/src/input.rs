//! Trackables of one file version together with its lazily hashed lines.

use std::fmt;

use ftrack_error::{Result, TrackError};
use ftrack_hash::{BlockHashSequence, DEFAULT_HALF_BLOCK_SIZE, LineHashSequence};
use once_cell::sync::OnceCell;
use tracing::debug;

/// Caller-provided access to the text of a file version.
pub trait LineSource: Send + Sync {
    /// All lines of the file, in order.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`TrackError::LineSource`] by the input.
    fn read_lines(&self) -> Result<Vec<String>>;
}

impl<F> LineSource for F
where
    F: Fn() -> Result<Vec<String>> + Send + Sync,
{
    fn read_lines(&self) -> Result<Vec<String>> {
        self()
    }
}

enum LineOrigin {
    Hashes(Vec<String>),
    Lines(Vec<String>),
    Source(Box<dyn LineSource>),
}

/// Raw or base side of a tracking run.
///
/// Line and block hash sequences are computed on first use and cached; the
/// caches are safe to populate from several threads at once.
pub struct Input<T> {
    trackables: Vec<T>,
    origin: LineOrigin,
    half_block_size: usize,
    line_hashes: OnceCell<LineHashSequence>,
    block_hashes: OnceCell<BlockHashSequence>,
}

impl<T> Input<T> {
    fn with_origin(trackables: Vec<T>, origin: LineOrigin) -> Self {
        Self {
            trackables,
            origin,
            half_block_size: DEFAULT_HALF_BLOCK_SIZE,
            line_hashes: OnceCell::new(),
            block_hashes: OnceCell::new(),
        }
    }

    /// Input whose line hashes are already known, typically a stored version.
    #[must_use]
    pub fn from_line_hashes(trackables: Vec<T>, line_hashes: Vec<String>) -> Self {
        Self::with_origin(trackables, LineOrigin::Hashes(line_hashes))
    }

    /// Input over the text of the file; lines are hashed on first use.
    #[must_use]
    pub fn from_lines(trackables: Vec<T>, lines: Vec<String>) -> Self {
        Self::with_origin(trackables, LineOrigin::Lines(lines))
    }

    /// Input reading its lines from `source` on first use.
    #[must_use]
    pub fn from_source(trackables: Vec<T>, source: impl LineSource + 'static) -> Self {
        Self::with_origin(trackables, LineOrigin::Source(Box::new(source)))
    }

    /// Override the block window (lines on each side of the anchor).
    #[must_use]
    pub fn with_half_block_size(mut self, half_block_size: usize) -> Self {
        self.half_block_size = half_block_size;
        self.block_hashes = OnceCell::new();
        self
    }

    #[must_use]
    pub fn trackables(&self) -> &[T] {
        &self.trackables
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trackables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trackables.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`TrackError::LineSource`] when the line provider fails.
    pub fn line_hash_sequence(&self) -> Result<&LineHashSequence> {
        self.line_hashes.get_or_try_init(|| {
            let sequence = match &self.origin {
                LineOrigin::Hashes(hashes) => LineHashSequence::new(hashes.clone()),
                LineOrigin::Lines(lines) => LineHashSequence::for_lines(lines),
                LineOrigin::Source(source) => {
                    let lines = source.read_lines().map_err(|err| match err {
                        TrackError::LineSource { .. } => err,
                        other => TrackError::line_source(other.to_string()),
                    })?;
                    LineHashSequence::for_lines(&lines)
                }
            };
            debug!(lines = sequence.len(), "line hash sequence built");
            Ok(sequence)
        })
    }

    /// # Errors
    ///
    /// Returns [`TrackError::LineSource`] when the line provider fails.
    pub fn block_hash_sequence(&self) -> Result<&BlockHashSequence> {
        self.block_hashes.get_or_try_init(|| {
            let lines = self.line_hash_sequence()?;
            Ok(BlockHashSequence::with_half_block_size(
                lines,
                self.half_block_size,
            ))
        })
    }
}

impl<T> fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            LineOrigin::Hashes(hashes) => format!("Hashes(len={})", hashes.len()),
            LineOrigin::Lines(lines) => format!("Lines(len={})", lines.len()),
            LineOrigin::Source(_) => "Source".to_owned(),
        };
        f.debug_struct("Input")
            .field("trackables", &self.trackables.len())
            .field("origin", &origin)
            .field("half_block_size", &self.half_block_size)
            .field("line_hashes_cached", &self.line_hashes.get().is_some())
            .field("block_hashes_cached", &self.block_hashes.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use ftrack_hash::hash_line;

    #[test]
    fn hashes_lines_lazily_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let input: Input<()> = Input::from_source(Vec::new(), move || -> Result<Vec<String>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["a();".to_owned(), "b();".to_owned()])
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let lines = input.line_hash_sequence().expect("lines");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.hash_for_line(1), hash_line("a();"));
        let _ = input.block_hash_sequence().expect("blocks");
        let _ = input.line_hash_sequence().expect("cached lines");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_read_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let input: Input<()> = Input::from_source(Vec::new(), move || -> Result<Vec<String>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((0..500).map(|i| format!("line {i}")).collect())
        });
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let blocks = input.block_hash_sequence().expect("blocks");
                    assert_eq!(blocks.len(), 500);
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn source_failure_is_reported_and_not_cached() {
        let input: Input<()> = Input::from_source(Vec::new(), || -> Result<Vec<String>> {
            Err(TrackError::internal("file vanished"))
        });
        let err = input.line_hash_sequence().expect_err("provider fails");
        assert!(matches!(
            err,
            TrackError::LineSource { ref detail } if detail.contains("file vanished")
        ));
        assert!(input.block_hash_sequence().is_err());
    }

    #[test]
    fn precomputed_hashes_and_custom_window() {
        let input = Input::from_line_hashes(vec![1_u8, 2], vec!["x".into(), "y".into(), "z".into()])
            .with_half_block_size(1);
        assert_eq!(input.len(), 2);
        assert!(!input.is_empty());
        assert_eq!(input.trackables(), &[1, 2]);
        assert_eq!(input.line_hash_sequence().expect("lines").hash_for_line(3), "z");
        assert_eq!(input.block_hash_sequence().expect("blocks").half_block_size(), 1);
        assert!(format!("{input:?}").contains("Hashes(len=3)"));
    }
}
