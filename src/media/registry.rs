//! Weak-reference media lookup
//!
//! Surfaces and composition layers hold a [`MediaId`], never an owning
//! pointer. Resolution goes through this registry and may come up empty;
//! that is "nothing to draw", not an error.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use crate::error::RenderError;

use super::{MediaId, MediaSource};

/// Lookup table from media id to a weakly held source.
#[derive(Default)]
pub struct MediaRegistry {
    entries: HashMap<MediaId, Weak<dyn MediaSource>>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own id. Re-registering replaces the entry.
    pub fn register<M: MediaSource + 'static>(&mut self, media: &Arc<M>) {
        let media: Arc<dyn MediaSource> = media.clone();
        let weak: Weak<dyn MediaSource> = Arc::downgrade(&media);
        self.entries.insert(media.id(), weak);
    }

    /// Forget a source. Resolving its id afterwards returns `None`.
    pub fn unregister(&mut self, id: MediaId) {
        self.entries.remove(&id);
    }

    /// Resolve an id to a live source, or `None` if unknown or dropped.
    pub fn resolve(&self, id: MediaId) -> Option<Arc<dyn MediaSource>> {
        self.entries.get(&id).and_then(Weak::upgrade)
    }

    /// Drop entries whose source no longer exists.
    pub fn prune(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that assigning `candidate` as an input of `root` cannot close a
    /// reference loop.
    ///
    /// Walks `referenced_media` from the candidate with a visited set;
    /// reaching `root` means the assignment would let a composition sample
    /// itself through a chain of nested compositions.
    pub fn check_cycle(&self, root: MediaId, candidate: MediaId) -> Result<(), RenderError> {
        let mut visited: HashSet<MediaId> = HashSet::new();
        let mut stack = vec![candidate];
        while let Some(id) = stack.pop() {
            if id == root {
                return Err(RenderError::CompositionCycle(candidate));
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(media) = self.resolve(id) {
                stack.extend(media.referenced_media());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeMedia {
        id: MediaId,
        refs: Mutex<Vec<MediaId>>,
    }

    impl FakeMedia {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: MediaId::new(),
                refs: Mutex::new(Vec::new()),
            })
        }
    }

    impl MediaSource for FakeMedia {
        fn id(&self) -> MediaId {
            self.id
        }

        fn texture(&self) -> Option<Arc<wgpu::TextureView>> {
            None
        }

        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn referenced_media(&self) -> Vec<MediaId> {
            self.refs.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let registry = MediaRegistry::new();
        assert!(registry.resolve(MediaId::new()).is_none());
    }

    #[test]
    fn test_resolve_after_drop_is_none() {
        let mut registry = MediaRegistry::new();
        let media = FakeMedia::new();
        let id = media.id();
        registry.register(&media);
        assert!(registry.resolve(id).is_some());

        drop(media);
        assert!(registry.resolve(id).is_none());

        registry.prune();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_direct_cycle_rejected() {
        let mut registry = MediaRegistry::new();
        let comp = FakeMedia::new();
        registry.register(&comp);

        // comp -> comp
        assert!(registry.check_cycle(comp.id(), comp.id()).is_err());
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let mut registry = MediaRegistry::new();
        let a = FakeMedia::new();
        let b = FakeMedia::new();
        registry.register(&a);
        registry.register(&b);

        // b already references a, so a must not be allowed to reference b.
        b.refs.lock().unwrap().push(a.id());
        assert!(registry.check_cycle(a.id(), b.id()).is_err());
    }

    #[test]
    fn test_acyclic_assignment_allowed() {
        let mut registry = MediaRegistry::new();
        let a = FakeMedia::new();
        let b = FakeMedia::new();
        registry.register(&a);
        registry.register(&b);

        assert!(registry.check_cycle(a.id(), b.id()).is_ok());
    }
}
