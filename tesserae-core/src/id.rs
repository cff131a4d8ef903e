//! # IDs
//! Structure members, documents, and selections are referred to by stable identifiers
//! that survive for the whole life of the process and are never recycled, even across
//! delete/undo cycles. This is implemented via the `ObjectId<T>` type, a 128-bit random
//! identifier namespaced by the type T.
//!
//! To mint a fresh ID, use `ObjectId<YourNamespaceTy>`'s `Default` impl.

/// ID that is unique within (and beyond) this execution of the program.
/// IDs with different namespace types may never be compared or substituted for
/// one another, which the phantom parameter enforces at compile time.
pub struct ObjectId<T: std::any::Any> {
    id: uuid::Uuid,
    // Namespace marker
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> ObjectId<T> {
    /// Get the raw uuid of this ID. IDs from differing namespaces may
    /// theoretically collide, but random v4 uuids make that academic.
    #[must_use]
    pub fn uuid(&self) -> uuid::Uuid {
        self.id
    }
}
impl<T: std::any::Any> Clone for ObjectId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for ObjectId<T> {}
impl<T: std::any::Any> std::cmp::PartialEq<ObjectId<T>> for ObjectId<T> {
    fn eq(&self, other: &ObjectId<T>) -> bool {
        // Namespace already checked at compile time - Self::T == Other::T of course!
        self.id == other.id
    }
}
impl<T: std::any::Any> std::cmp::Eq for ObjectId<T> {}

// Safety - it's just a uuid. We need these because if T is !Send or !Sync
// that is carried over to the ID, even though we don't actually store a T
// and thus shouldn't be bound by this.
unsafe impl<T: std::any::Any> Send for ObjectId<T> {}
unsafe impl<T: std::any::Any> Sync for ObjectId<T> {}

impl<T: std::any::Any> std::hash::Hash for ObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: std::any::Any> Default for ObjectId<T> {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> std::fmt::Display for ObjectId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Unwrap here is safe - the rsplit will always return at least one element, even for empty strings.
        write!(
            f,
            "{}#{}",
            std::any::type_name::<T>().rsplit("::").next().unwrap(),
            self.id.as_simple()
        )
    }
}
impl<T: std::any::Any> std::fmt::Debug for ObjectId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <ObjectId<T> as std::fmt::Display>::fmt(self, f)
    }
}
