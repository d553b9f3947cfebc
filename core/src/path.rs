//! Path tracking — where in the data a comparison is happening
//!
//! A [`Path`] is a root label plus a stack of [`PathStep`]s. It grows on
//! descent and shrinks on backtrack; the engine never shares one across calls.
//!
//! ```
//! use deepmatch::{Path, PathStep};
//!
//! let mut path = Path::new("DATA");
//! path.push(PathStep::Field("items".into()));
//! path.push(PathStep::Index(2));
//! assert_eq!(path.to_string(), "DATA.items[2]");
//! ```

use std::fmt;
use std::sync::Arc;

/// One accessor in a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// `.name`
    Field(Arc<str>),
    /// `[i]`
    Index(usize),
    /// `[key]`, holding the rendered key.
    MapKey(String),
    /// A label appended verbatim, e.g. `<All#1/2>`.
    Custom(String),
    /// Pointer dereference. Implicit before a field or index, `*` prefix otherwise.
    Deref,
    /// Wraps what precedes it: `len(DATA)`.
    Func(&'static str),
    /// The panic raised by a user callback.
    PanicReturn,
}

/// Accessor trail from the root label to the value being compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    root: Arc<str>,
    steps: Vec<PathStep>,
}

impl Path {
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            root: Arc::from(root),
            steps: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Number of steps below the root.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drop steps until only `len` remain.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.steps.truncate(len);
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        let mut out = self.root.to_string();
        let mut derefs = 0usize;
        for step in &self.steps {
            match step {
                PathStep::Deref => {
                    derefs += 1;
                    continue;
                }
                PathStep::Field(name) => {
                    let _ = write!(out, ".{name}");
                }
                PathStep::Index(i) => {
                    let _ = write!(out, "[{i}]");
                }
                PathStep::MapKey(key) => {
                    let _ = write!(out, "[{key}]");
                }
                PathStep::Custom(label) => out.push_str(label),
                PathStep::PanicReturn => out.push_str("→panic()"),
                PathStep::Func(name) => {
                    let stars = "*".repeat(derefs);
                    out = format!("{name}({stars}{out})");
                }
            }
            derefs = 0;
        }
        for _ in 0..derefs {
            f.write_char('*')?;
        }
        f.write_str(&out)
    }
}
