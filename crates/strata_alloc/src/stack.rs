//! Heap-free call-stack capture.
//!
//! Frames are stored as raw return addresses in a fixed array, so capturing
//! inside an allocator never allocates. Symbols are resolved only when a
//! report is printed.

use std::cell::Cell;
use std::ffi::c_void;
use std::fmt::{self, Write as _};

/// Capacity of the frame buffer of a [`StackTrace`].
pub const MAX_STACK_DEPTH: usize = 32;

thread_local! {
    /// Set while this thread is inside `backtrace::trace`.
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

/// Return addresses of a captured call stack, innermost first.
#[derive(Clone, Copy)]
pub struct StackTrace {
    frames: [usize; MAX_STACK_DEPTH],
    len: usize,
}

impl StackTrace {
    /// A stack with no frames.
    pub const EMPTY: Self = Self {
        frames: [0; MAX_STACK_DEPTH],
        len: 0,
    };

    /// Captures up to `depth` frames of the current call stack.
    ///
    /// Returns an empty stack when called re-entrantly (the unwinder itself
    /// allocated) or while the thread is being torn down.
    #[must_use]
    pub fn capture(depth: usize) -> Self {
        let depth = depth.min(MAX_STACK_DEPTH);
        if depth == 0 {
            return Self::EMPTY;
        }

        CAPTURING
            .try_with(|capturing| {
                if capturing.replace(true) {
                    return Self::EMPTY;
                }
                let mut stack = Self::EMPTY;
                backtrace::trace(|frame| {
                    stack.frames[stack.len] = frame.ip() as usize;
                    stack.len += 1;
                    stack.len < depth
                });
                capturing.set(false);
                stack
            })
            .unwrap_or(Self::EMPTY)
    }

    /// Captured return addresses.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[usize] {
        &self.frames[..self.len]
    }

    /// Number of captured frames.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True iff no frame was captured.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One line per frame with symbol name and location where available.
    ///
    /// Allocates; never call it with the tracker lock held.
    #[must_use]
    pub fn resolve(&self) -> Vec<String> {
        self.frames()
            .iter()
            .enumerate()
            .map(|(i, &ip)| {
                let mut line = format!("#{i:<2} {ip:#018x}");
                backtrace::resolve(ip as *mut c_void, |symbol| {
                    if let Some(name) = symbol.name() {
                        let _ = write!(line, " {name}");
                    }
                    if let (Some(file), Some(lineno)) = (symbol.filename(), symbol.lineno()) {
                        let _ = write!(line, " at {}:{lineno}", file.display());
                    }
                });
                line
            })
            .collect()
    }
}

impl Default for StackTrace {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackTrace")
            .field("frames", &self.frames())
            .finish()
    }
}
