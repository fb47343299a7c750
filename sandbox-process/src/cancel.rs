use std::sync::{
    atomic::{AtomicBool, Ordering::SeqCst},
    Arc,
};

/// A one-shot cancellation signal that cooperatively notifies its
/// observers (`spec.md` §3.1, §5).
///
/// Cloning shares the same underlying flag. A [`Cancel`] can be chained to
/// one or more parents, by real subscription rather than a snapshot: a
/// child's [`is_cancelled`][Self::is_cancelled] also consults its parents
/// every time it's called, so a parent firing after the child was
/// constructed is still observed (used to compose the shell's top-level
/// Ctrl+C token with each spawned process's individual token, per
/// `spec.md` §4.7).
#[derive(Clone)]
pub struct Cancel(Arc<Inner>);

struct Inner
{
    fired: AtomicBool,
    parents: Vec<Cancel>,
}

impl Cancel
{
    /// Create a fresh, unfired token with no parents.
    pub fn new() -> Self
    {
        Self(Arc::new(Inner { fired: AtomicBool::new(false), parents: Vec::new() }))
    }

    fn with_parents(parents: Vec<Cancel>) -> Self
    {
        Self(Arc::new(Inner { fired: AtomicBool::new(false), parents }))
    }

    /// Create a child token subscribed to `self`: cancelling `self` at
    /// any point, before or after this call, is observed by the child's
    /// [`is_cancelled`][Self::is_cancelled].
    pub fn child(&self) -> Self
    {
        Self::with_parents(vec![self.clone()])
    }

    /// Create a token that is cancelled as soon as any input is, now or
    /// later — a multi-parent child (`spec.md` §4.7, §9 "cancellation
    /// tokens compose by subscription").
    pub fn combined(tokens: impl IntoIterator<Item = Cancel>) -> Self
    {
        Self::with_parents(tokens.into_iter().collect())
    }

    /// Fire the token. Idempotent. Does not directly touch any child's
    /// flag; children observe this through the parent link instead.
    pub fn cancel(&self)
    {
        self.0.fired.store(true, SeqCst);
    }

    /// Whether the token, or any of its ancestors, has fired.
    pub fn is_cancelled(&self) -> bool
    {
        self.0.fired.load(SeqCst) || self.0.parents.iter().any(Cancel::is_cancelled)
    }
}

impl Default for Cancel
{
    fn default() -> Self
    {
        Self::new()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn clone_shares_state()
    {
        let token = Cancel::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn child_observes_already_fired_parent()
    {
        let parent = Cancel::new();
        parent.cancel();
        let child = parent.child();
        assert!(child.is_cancelled());
    }

    #[test]
    fn combined_fires_if_any_input_fired()
    {
        let a = Cancel::new();
        let b = Cancel::new();
        b.cancel();
        let combined = Cancel::combined([a, b]);
        assert!(combined.is_cancelled());
    }

    #[test]
    fn child_observes_parent_cancelled_after_construction()
    {
        let parent = Cancel::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn grandchild_observes_a_fire_anywhere_up_the_chain()
    {
        let root = Cancel::new();
        let child = root.child();
        let grandchild = child.child();
        root.cancel();
        assert!(grandchild.is_cancelled());
    }
}
