//! Ordering discipline for cascading transitions.
//!
//! A transition's immediate behavior must run before the triggering operation
//! returns; its delayed behavior (effects on other components) must wait until
//! every enclosing transition has finished its own immediate work. Frames are
//! queued FIFO under the frame executing when they were opened, and only the
//! outermost frame drains: its own delayed behavior first, then each queued
//! child depth-first in queue order. The drain is driven by an explicit cursor
//! stack, so cascade length never consumes host call stack.
//!
//! The stack itself only schedules; the runtime executor owns the behaviors
//! and drives `open`/`begin`/`end`/`postpone`/`next_child`.

use std::collections::VecDeque;

/// Handle of one frame within a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

#[derive(Debug)]
struct Frame<W> {
    work: W,
    depth: usize,
    parent: Option<FrameId>,
    children: VecDeque<FrameId>,
}

/// The call stack for one command's cascade.
#[derive(Debug)]
pub struct TransitionCallStack<W> {
    frames: Vec<Frame<W>>,
    current: Option<FrameId>,
}

impl<W> Default for TransitionCallStack<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> TransitionCallStack<W> {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            current: None,
        }
    }

    /// Opens a frame for `work` as a child of the currently executing frame.
    pub fn open(&mut self, work: W) -> FrameId {
        let parent = self.current;
        let depth = parent.map(|id| self.depth(id) + 1).unwrap_or(1);
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            work,
            depth,
            parent,
            children: VecDeque::new(),
        });
        id
    }

    /// Makes `frame` the currently executing frame; returns the previous one
    /// so the caller can restore it with [`TransitionCallStack::end`].
    pub fn begin(&mut self, frame: FrameId) -> Option<FrameId> {
        self.current.replace(frame)
    }

    /// Restores the previously executing frame after a behavior ran.
    pub fn end(&mut self, previous: Option<FrameId>) {
        self.current = previous;
    }

    /// Defers the frame's delayed behavior. Inside an outer frame the work is
    /// queued FIFO under that frame and `None` comes back; for an outermost
    /// frame the caller receives it back and must drain.
    pub fn postpone(&mut self, frame: FrameId) -> Option<FrameId> {
        match self.parent(frame) {
            Some(parent) => {
                self.frame_mut(parent).children.push_back(frame);
                None
            }
            None => Some(frame),
        }
    }

    /// Next queued child of `frame`, in the order the children were postponed.
    pub fn next_child(&mut self, frame: FrameId) -> Option<FrameId> {
        self.frame_mut(frame).children.pop_front()
    }

    pub fn work(&self, frame: FrameId) -> &W {
        &self.frame(frame).work
    }

    pub fn work_mut(&mut self, frame: FrameId) -> &mut W {
        &mut self.frame_mut(frame).work
    }

    /// Nesting depth of the frame; outermost frames have depth 1.
    pub fn depth(&self, frame: FrameId) -> usize {
        self.frame(frame).depth
    }

    pub fn parent(&self, frame: FrameId) -> Option<FrameId> {
        self.frame(frame).parent
    }

    /// True when no frame is executing (between cascades).
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    fn frame(&self, id: FrameId) -> &Frame<W> {
        // FrameIds are only minted by `open`, so the index is always valid.
        &self.frames[id.0]
    }

    fn frame_mut(&mut self, id: FrameId) -> &mut Frame<W> {
        &mut self.frames[id.0]
    }
}

#[cfg(test)]
#[path = "tests/call_stack_tests.rs"]
mod tests;
