//! Reactive Context
//!
//! The active stack tracks which computation is currently running. This
//! enables automatic dependency tracking: when a key is read, the current
//! computation is registered as a dependent.
//!
//! # Implementation
//!
//! Each engine owns one stack. When a computation runs it is pushed onto
//! the stack, and the [`ContextGuard`] returned by [`ActiveStack::enter`]
//! pops it again when dropped. Nested computations therefore restore the
//! outer computation as current by stack discipline, even if the inner body
//! panics.
//!
//! Tracking can also be paused. Pausing is a depth counter rather than a
//! flag, so nested pause scopes compose: tracking resumes only when the
//! outermost scope ends. Each computation run starts with the counter at
//! zero and restores the caller's count when it finishes.

use std::cell::{Cell, RefCell};

use super::effect::Effect;
use super::subscriber::SubscriberId;

/// The stack of running computations plus the tracking pause depth.
#[derive(Default)]
pub struct ActiveStack {
    stack: RefCell<Vec<Effect>>,
    paused: Cell<usize>,
}

impl ActiveStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, effect: Effect) {
        self.stack.borrow_mut().push(effect);
    }

    /// Pop the top computation. Popping an empty stack is a no-op.
    pub fn pop(&self) -> Option<Effect> {
        self.stack.borrow_mut().pop()
    }

    /// The computation currently running, if any.
    pub fn current(&self) -> Option<Effect> {
        self.stack.borrow().last().cloned()
    }

    pub fn current_id(&self) -> Option<SubscriberId> {
        self.stack.borrow().last().map(Effect::id)
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Check if there is a running computation.
    pub fn is_active(&self) -> bool {
        !self.stack.borrow().is_empty()
    }

    /// Enter a new reactive context for the given computation.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(&self, effect: Effect) -> ContextGuard<'_> {
        let id = effect.id();
        self.push(effect);
        let paused = self.paused.replace(0);
        ContextGuard {
            stack: self,
            id,
            paused,
        }
    }

    pub fn pause(&self) {
        self.paused.set(self.paused.get() + 1);
    }

    pub fn resume(&self) {
        self.paused.set(self.paused.get().saturating_sub(1));
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get() > 0
    }

    /// Whether a read right now would be recorded.
    pub fn should_track(&self) -> bool {
        !self.is_paused() && self.is_active()
    }

    /// Pause tracking until the returned guard is dropped.
    pub fn pause_scope(&self) -> PauseGuard<'_> {
        self.pause();
        PauseGuard { stack: self }
    }
}

/// Guard that pops the context when dropped.
pub struct ContextGuard<'a> {
    stack: &'a ActiveStack,
    id: SubscriberId,
    paused: usize,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.pop();

        // Verify we're popping the right context.
        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.id,
                "ContextGuard mismatch: expected {:?}, got {:?}",
                self.id,
                effect.id()
            );
        }
        self.stack.paused.set(self.paused);
    }
}

/// Guard that resumes tracking when dropped.
pub struct PauseGuard<'a> {
    stack: &'a ActiveStack,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.stack.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{EffectOptions, Engine};

    fn lazy_effect(engine: &Engine) -> Effect {
        engine.effect_with(|| (), EffectOptions::new().lazy(true))
    }

    #[test]
    fn context_tracks_subscriber() {
        let engine = Engine::new();
        let stack = ActiveStack::new();
        let effect = lazy_effect(&engine);

        assert!(!stack.is_active());
        assert!(stack.current_id().is_none());

        {
            let _ctx = stack.enter(effect.clone());

            assert!(stack.is_active());
            assert_eq!(stack.current_id(), Some(effect.id()));
        }

        // Context should be cleaned up after drop
        assert!(!stack.is_active());
        assert!(stack.current_id().is_none());
    }

    #[test]
    fn nested_contexts() {
        let engine = Engine::new();
        let stack = ActiveStack::new();
        let outer = lazy_effect(&engine);
        let inner = lazy_effect(&engine);

        {
            let _ctx1 = stack.enter(outer.clone());
            assert_eq!(stack.current_id(), Some(outer.id()));

            {
                let _ctx2 = stack.enter(inner.clone());
                assert_eq!(stack.current_id(), Some(inner.id()));
                assert_eq!(stack.depth(), 2);
            }

            // After inner context drops, outer should be current
            assert_eq!(stack.current_id(), Some(outer.id()));
        }

        assert!(stack.current_id().is_none());
    }

    #[test]
    fn popping_an_empty_stack_is_harmless() {
        let stack = ActiveStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.current().is_none());
    }

    #[test]
    fn nested_pauses_need_matching_resumes() {
        let engine = Engine::new();
        let stack = ActiveStack::new();
        let _ctx = stack.enter(lazy_effect(&engine));

        assert!(stack.should_track());
        {
            let _outer = stack.pause_scope();
            {
                let _inner = stack.pause_scope();
            }
            assert!(!stack.should_track());
        }
        assert!(stack.should_track());
    }

    #[test]
    fn entering_a_context_resets_the_pause_depth() {
        let engine = Engine::new();
        let stack = ActiveStack::new();
        let _pause = stack.pause_scope();
        {
            let _ctx = stack.enter(lazy_effect(&engine));
            assert!(stack.should_track());
        }
        assert!(stack.is_paused());
    }
}
