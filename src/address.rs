/*!
# Structural Addresses.

Random choices are named by *where they happen*, not by the order in which
they happen. An [`Address`] is the sequence of frames pushed between procedure
entry and the ERP callsite; a [`Frame`] pairs a user-supplied site id with a
loop index that distinguishes iterations of an enclosing repetition.

Two executions of the same procedure that diverge in control flow still agree
on the addresses of their common prefix, which is what lets a replay reuse
previously sampled choices.

The [`AddressStack`] is the mutable cursor for the run in progress: frames are
pushed on entry to a lexical site and popped on exit, and the stack must be
empty again when the procedure returns.
*/

use std::fmt;

use crate::core::McmcError;

/// One address component: a lexical site id plus the loop index of the
/// iteration it was visited in (0 outside of loops).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub site: u32,
    pub loop_index: u32,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loop_index == 0 {
            write!(f, "{}", self.site)
        } else {
            write!(f, "{}#{}", self.site, self.loop_index)
        }
    }
}

/// The full structural name of an ERP callsite instance.
///
/// Addresses are cheap to clone and hashable, so they double as the key of
/// the trace's record map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Address(Vec<Frame>);

impl Address {
    /// Number of frames, i.e. the stack depth at which the choice was made.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// The address cursor of the run in progress.
///
/// Site ids only need to be unique among siblings under the same parent
/// frame. Loop iterations are *not* detected automatically: a procedure that
/// draws choices inside a loop must push one frame for the loop and call
/// [`AddressStack::set_loop_index`] at the top of every iteration, otherwise
/// each iteration would collide on the same address.
#[derive(Debug, Clone, Default)]
pub struct AddressStack {
    frames: Vec<Frame>,
}

impl AddressStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a lexical site. A fresh frame starts at loop index 0.
    pub fn push(&mut self, site: u32) {
        self.frames.push(Frame {
            site,
            loop_index: 0,
        });
    }

    /// Leaves the innermost site.
    pub fn pop(&mut self) -> Result<(), McmcError> {
        match self.frames.pop() {
            Some(_) => Ok(()),
            None => Err(McmcError::invariant("address stack underflow")),
        }
    }

    /// Updates the loop index of the innermost frame.
    pub fn set_loop_index(&mut self, index: u32) -> Result<(), McmcError> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.loop_index = index;
                Ok(())
            }
            None => Err(McmcError::invariant(
                "set_loop_index called with an empty address stack",
            )),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Snapshot of the current address.
    pub fn current(&self) -> Address {
        Address(self.frames.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let mut stack = AddressStack::new();
        assert!(stack.is_empty());

        stack.push(3);
        stack.push(1);
        assert_eq!(stack.depth(), 2);
        let addr = stack.current();
        assert_eq!(addr.depth(), 2);
        assert_eq!(addr.frames()[0].site, 3);
        assert_eq!(addr.frames()[1].site, 1);

        stack.pop().unwrap();
        stack.pop().unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn loop_index_distinguishes_iterations() {
        let mut stack = AddressStack::new();
        stack.push(0);

        stack.set_loop_index(0).unwrap();
        let first = stack.current();
        stack.set_loop_index(1).unwrap();
        let second = stack.current();

        assert_ne!(first, second);
        assert_eq!(first.frames()[0].site, second.frames()[0].site);
    }

    #[test]
    fn fresh_frame_resets_loop_index() {
        let mut stack = AddressStack::new();
        stack.push(0);
        stack.set_loop_index(7).unwrap();
        stack.push(1);
        assert_eq!(stack.current().frames()[1].loop_index, 0);
    }

    #[test]
    fn underflow_is_an_invariant_violation() {
        let mut stack = AddressStack::new();
        assert!(matches!(
            stack.pop(),
            Err(McmcError::InvariantViolation(_))
        ));
        assert!(matches!(
            stack.set_loop_index(0),
            Err(McmcError::InvariantViolation(_))
        ));
    }

    #[test]
    fn display_includes_loop_indices() {
        let mut stack = AddressStack::new();
        stack.push(2);
        stack.push(5);
        stack.set_loop_index(3).unwrap();
        assert_eq!(stack.current().to_string(), "/2/5#3");
    }
}
