//! Stable identifier allocation.
//!
//! An [`IdAllocator`] maps source keys to globally unique identifiers for
//! the duration of one reconstruction run. The first request for a key mints
//! an identifier; every later request for the same key returns it again, so
//! a block piece and the pieces naming it as their parent always agree.
//!
//! Allocators are never shared between documents. The reconstruction entry
//! points take one by value, so reusing an allocator for a second document
//! does not compile.
//!
//! # Example
//!
//! ```rust
//! use editorial_core::allocator::IdAllocator;
//! use editorial_core::models::SourceKey;
//!
//! let mut ids = IdAllocator::new();
//! let a = ids.resolve(&SourceKey::Int(1));
//! assert_eq!(ids.resolve(&SourceKey::Int(1)), a);
//! assert_ne!(ids.resolve(&SourceKey::Int(2)), a);
//! ```

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::SourceKey;

type Generator = Box<dyn FnMut() -> Uuid + Send>;

/// Per-run memo table from [`SourceKey`] to [`Uuid`].
pub struct IdAllocator {
    memo: HashMap<SourceKey, Uuid>,
    issued: HashSet<Uuid>,
    generate: Generator,
}

impl IdAllocator {
    /// Allocator backed by random (v4) UUIDs.
    pub fn new() -> Self {
        Self::with_generator(Uuid::new_v4)
    }

    /// Allocator backed by a custom identifier source.
    ///
    /// Identifiers the source repeats are skipped, so uniqueness holds even
    /// for a poor generator as long as it eventually yields something new.
    pub fn with_generator(generate: impl FnMut() -> Uuid + Send + 'static) -> Self {
        Self {
            memo: HashMap::new(),
            issued: HashSet::new(),
            generate: Box::new(generate),
        }
    }

    /// Allocator issuing `00000000-0000-0000-0000-000000000001`, `…02`, …
    ///
    /// Deterministic output for fixtures and tests.
    pub fn sequential() -> Self {
        let mut next: u128 = 0;
        Self::with_generator(move || {
            next += 1;
            Uuid::from_u128(next)
        })
    }

    /// Identifier for `key`, minted on first use and stable afterwards.
    pub fn resolve(&mut self, key: &SourceKey) -> Uuid {
        if let Some(id) = self.memo.get(key) {
            return *id;
        }
        let id = self.fresh();
        self.memo.insert(key.clone(), id);
        id
    }

    /// A new identifier that is not associated with any key.
    pub fn fresh(&mut self) -> Uuid {
        loop {
            let id = (self.generate)();
            if self.issued.insert(id) {
                return id;
            }
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdAllocator")
            .field("keys", &self.memo.len())
            .field("issued", &self.issued.len())
            .finish()
    }
}
