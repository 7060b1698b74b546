use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// A named region of the input, in absolute byte offsets.
#[derive(Debug, Clone)]
struct ScopeItem {
    start: usize,
    end: usize,
    description: Arc<str>,
}

impl Display for ScopeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}] {}", self.start, self.end, self.description)
    }
}

/// The chain of scopes that were active when an error was created.
#[derive(Debug, Clone)]
struct ScopeInfo {
    data_size: usize,
    scopes: Vec<ScopeItem>,
}

impl Display for ScopeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\n- {} byte input", self.data_size)?;
        for scope in &self.scopes {
            write!(f, "\n- {scope}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum ContextInner {
    Root {
        data_size: usize,
    },
    Nested {
        parent: BlockContext,
        scope_item: ScopeItem,
    },
}

/// Tracks which nested region of the input a reader is looking at.
///
/// Contexts are cheap to clone, and a nested context keeps its parent alive,
/// so sub-readers can outlive the borrow of the reader that created them.
#[derive(Debug, Clone)]
pub(crate) struct BlockContext(Arc<ContextInner>);

impl BlockContext {
    /// Create a new root context.
    #[must_use]
    pub(crate) fn new_root(data_size: usize) -> Self {
        Self(Arc::new(ContextInner::Root { data_size }))
    }

    /// Create a new nested context covering `start..end` of the input.
    #[must_use]
    pub(crate) fn nested<D>(&self, start: usize, end: usize, description: D) -> Self
    where
        D: Into<Arc<str>>,
    {
        Self(Arc::new(ContextInner::Nested {
            parent: self.clone(),
            scope_item: ScopeItem {
                start,
                end,
                description: description.into(),
            },
        }))
    }

    fn make_scope_info(&self) -> ScopeInfo {
        match &*self.0 {
            ContextInner::Root { data_size } => ScopeInfo {
                data_size: *data_size,
                scopes: Vec::new(),
            },
            ContextInner::Nested { parent, scope_item } => {
                let mut info = parent.make_scope_info();
                info.scopes.push(scope_item.clone());
                info
            }
        }
    }

    pub(crate) fn create_error<E>(&self, position: usize, message: E) -> InvalidDataError
    where
        E: Error + Send + Sync + 'static,
    {
        InvalidDataError {
            backtrace: Backtrace::capture(),
            scope_info: self.make_scope_info(),
            position,
            message: Box::new(message),
        }
    }
}

/// An error that indicates that the data found in the input is invalid.
///
/// This does not represent a failure to read the data itself, only a problem
/// with the format of the data. The error remembers the absolute byte position
/// it was raised at and the named scopes that enclosed it.
#[derive(Debug)]
pub struct InvalidDataError {
    backtrace: Backtrace,
    scope_info: ScopeInfo,
    position: usize,
    message: Box<dyn Error + Send + Sync + 'static>,
}

impl InvalidDataError {
    /// The absolute byte offset in the input where the error was detected.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The descriptions of the enclosing scopes, outermost first.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope_info
            .scopes
            .iter()
            .map(|scope| &*scope.description)
    }

    /// The underlying reason for the error.
    #[must_use]
    pub fn message(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.message
    }
}

impl Display for InvalidDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid data at position {}: {}{}",
            self.position, self.message, self.scope_info
        )?;

        if let BacktraceStatus::Captured = self.backtrace.status() {
            write!(f, "\n\nBacktrace:\n{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl Error for InvalidDataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.message)
    }
}
