use std::cell::Cell;
use std::rc::Rc;

/// Ends a `repeat` loop.
///
/// Handed to the loop body on every iteration. Clones share one flag, so a
/// clone can be moved into a nested `tap` and invoked once the data that
/// decides termination has actually been read. The iteration that calls
/// [`terminate`](Self::terminate) still runs to completion; the loop just
/// is not restarted afterwards.
#[derive(Clone, Debug, Default)]
pub struct Terminator(Rc<Cell<bool>>);

impl Terminator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminate(&self) {
        self.0.set(true);
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.0.get()
    }
}
