//! # Sequence output buffer.
//!
//! Holds the raw lines produced by the steps of the current sequence,
//! interleaved with the boundary [`Marker`]s the reducer inserts. Lines are
//! stored verbatim and in arrival order; nothing is ever truncated.

use std::fmt;
use std::mem;
use std::sync::Arc;

/// Step boundary inserted by the reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Step `index` of `total` is about to run.
    StepStarting {
        index: usize,
        total: usize,
        label: String,
    },
    /// Step `index` succeeded.
    StepSucceeded { index: usize, label: String },
    /// Step `index` failed; the sequence stops here.
    StepFailed {
        index: usize,
        label: String,
        error: String,
    },
    /// Every step of the sequence succeeded.
    SequenceSucceeded { total: usize },
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::StepStarting {
                index,
                total,
                label,
            } => write!(f, "==> [{}/{total}] {label}", index + 1),
            Marker::StepSucceeded { label, .. } => write!(f, "<== ok: {label}"),
            Marker::StepFailed { label, error, .. } => write!(f, "<== FAILED: {label}: {error}"),
            Marker::SequenceSucceeded { total } => write!(f, "==> all {total} step(s) succeeded"),
        }
    }
}

/// One entry of the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputEntry {
    /// Raw line from a step, as produced.
    Line(String),
    /// Boundary marker.
    Marker(Marker),
}

/// Entries per sealed chunk.
const CHUNK: usize = 256;

/// Append-only buffer of the running sequence's output.
///
/// Full chunks are sealed behind an `Arc` and shared between clones, so a
/// snapshot copies at most one partial chunk however long the output grows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    sealed: Arc<Vec<Arc<[OutputEntry]>>>,
    tail: Vec<OutputEntry>,
}

impl OutputBuffer {
    pub fn push_line(&mut self, line: String) {
        self.push(OutputEntry::Line(line));
    }

    pub fn push_marker(&mut self, marker: Marker) {
        self.push(OutputEntry::Marker(marker));
    }

    fn push(&mut self, entry: OutputEntry) {
        self.tail.push(entry);
        if self.tail.len() >= CHUNK {
            let chunk: Arc<[OutputEntry]> = mem::take(&mut self.tail).into();
            Arc::make_mut(&mut self.sealed).push(chunk);
        }
    }

    pub fn clear(&mut self) {
        self.sealed = Arc::default();
        self.tail.clear();
    }

    /// All entries in arrival order.
    pub fn entries(&self) -> impl Iterator<Item = &OutputEntry> {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    /// Raw step lines only, markers skipped.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries().filter_map(|e| match e {
            OutputEntry::Line(l) => Some(l.as_str()),
            OutputEntry::Marker(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.sealed.len() * CHUNK + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the buffer as text, one entry per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            match entry {
                OutputEntry::Line(l) => out.push_str(l),
                OutputEntry::Marker(m) => out.push_str(&m.to_string()),
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_lines_verbatim() {
        let mut buf = OutputBuffer::default();
        buf.push_marker(Marker::StepStarting {
            index: 0,
            total: 1,
            label: "up (web@srv1)".into(),
        });
        buf.push_line("  Container web  Started\t".into());
        buf.push_marker(Marker::StepSucceeded {
            index: 0,
            label: "up (web@srv1)".into(),
        });

        assert_eq!(
            buf.render(),
            "==> [1/1] up (web@srv1)\n  Container web  Started\t\n<== ok: up (web@srv1)\n"
        );
        assert_eq!(buf.lines().collect::<Vec<_>>(), ["  Container web  Started\t"]);
    }

    #[test]
    fn test_clone_shares_sealed_chunks() {
        let mut buf = OutputBuffer::default();
        for i in 0..20_000 {
            buf.push_line(format!("line {i}"));
        }
        assert_eq!(buf.len(), 20_000);

        let snapshot = buf.clone();
        assert!(Arc::ptr_eq(&buf.sealed, &snapshot.sealed));
        assert!(snapshot.tail.len() < CHUNK);

        // Appending after a snapshot leaves the snapshot untouched.
        for i in 20_000..20_600 {
            buf.push_line(format!("line {i}"));
        }
        assert_eq!(snapshot.len(), 20_000);
        assert_eq!(snapshot.lines().last(), Some("line 19999"));
        assert_eq!(buf.len(), 20_600);
        assert!(buf.lines().eq((0..20_600).map(|i| format!("line {i}"))));
    }

    #[test]
    fn test_clear_drops_sealed_chunks() {
        let mut buf = OutputBuffer::default();
        for _ in 0..CHUNK + 1 {
            buf.push_marker(Marker::SequenceSucceeded { total: 1 });
        }
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.entries().count(), 0);
        assert_eq!(buf, OutputBuffer::default());
    }
}
