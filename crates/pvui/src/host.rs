//! The bridge to host-runtime values.
//!
//! The engine never evaluates the host language itself; it receives opaque
//! handles and drives them through a small protocol: decompose tagged data,
//! invoke closures, read strings and booleans, and hash for reconciliation
//! identity. Handles are reference counted and cheap to clone.
//!
//! Equality is conservative handle identity: two handles compare equal when
//! they share a representation (or are equal unboxed scalars), and distinct
//! handles compare unequal even if structurally identical. Hashing is
//! deterministic within a process; values without a meaningful hash (opaque
//! externals) collapse to [`UNHASHABLE_SENTINEL`], which makes them compare
//! equal for reconciliation identity. That trades update precision on
//! non-prop dependencies for liveness, so state that must survive belongs in
//! props.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::error::{Result, WidgetError};

/// Hash reported for host values that carry no usable hash of their own.
/// All such values collide on purpose and reconcile as equal.
pub const UNHASHABLE_SENTINEL: u64 = u64::MAX;

/// Signature of a host closure as seen from the engine.
pub type HostFn = dyn Fn(&[HostValue]) -> Result<HostValue>;

/// An opaque, reference-counted handle to a host-runtime value.
#[derive(Clone)]
pub struct HostValue(Rc<Repr>);

enum Repr {
    Bool(bool),
    Nat(u64),
    Str(String),
    Data {
        tag: u32,
        fields: SmallVec<[HostValue; 2]>,
    },
    Closure(Box<HostFn>),
    External {
        hash: Option<u64>,
    },
}

// === Construction ===

impl HostValue {
    pub fn bool(b: bool) -> Self {
        HostValue(Rc::new(Repr::Bool(b)))
    }

    pub fn nat(n: u64) -> Self {
        HostValue(Rc::new(Repr::Nat(n)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        HostValue(Rc::new(Repr::Str(s.into())))
    }

    /// A constructor application: variant `tag` with positional `fields`.
    pub fn data(tag: u32, fields: Vec<HostValue>) -> Self {
        HostValue(Rc::new(Repr::Data {
            tag,
            fields: SmallVec::from_vec(fields),
        }))
    }

    pub fn closure(f: impl Fn(&[HostValue]) -> Result<HostValue> + 'static) -> Self {
        HostValue(Rc::new(Repr::Closure(Box::new(f))))
    }

    /// An opaque host object. `hash` is the host's own hash for the object,
    /// or `None` when the object is not hashable.
    pub fn external(hash: Option<u64>) -> Self {
        HostValue(Rc::new(Repr::External { hash }))
    }

    pub fn unit() -> Self {
        Self::data(0, Vec::new())
    }

    // Option encoding: `none = 0`, `some v = 1 [v]`.

    pub fn none() -> Self {
        Self::data(0, Vec::new())
    }

    pub fn some(v: HostValue) -> Self {
        Self::data(1, vec![v])
    }

    pub fn option(v: Option<HostValue>) -> Self {
        match v {
            Some(v) => Self::some(v),
            None => Self::none(),
        }
    }

    /// Pair encoding: a single constructor with two fields.
    pub fn pair(a: HostValue, b: HostValue) -> Self {
        Self::data(0, vec![a, b])
    }

    // List encoding: `nil = 0`, `cons h t = 1 [h, t]`.

    pub fn nil() -> Self {
        Self::data(0, Vec::new())
    }

    pub fn cons(head: HostValue, tail: HostValue) -> Self {
        Self::data(1, vec![head, tail])
    }

    pub fn list(items: impl IntoIterator<Item = HostValue>) -> Self {
        let items: Vec<_> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Self::nil(), |tail, head| Self::cons(head, tail))
    }
}

// === Decomposition ===

impl HostValue {
    /// Constructor index of a tagged value. Booleans decompose as the
    /// two-constructor type `false = 0`, `true = 1`.
    pub fn variant_tag(&self) -> Result<u32> {
        match &*self.0 {
            Repr::Data { tag, .. } => Ok(*tag),
            Repr::Bool(b) => Ok(u32::from(*b)),
            _ => Err(WidgetError::VariantUnreachable("value has no variant tag")),
        }
    }

    /// Positional field of a constructor application.
    pub fn field(&self, i: usize) -> Result<HostValue> {
        match &*self.0 {
            Repr::Data { fields, .. } => fields
                .get(i)
                .cloned()
                .ok_or(WidgetError::VariantUnreachable("constructor field out of range")),
            _ => Err(WidgetError::VariantUnreachable("value has no fields")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &*self.0 {
            Repr::Str(s) => Ok(s),
            _ => Err(WidgetError::VariantUnreachable("expected a string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match &*self.0 {
            Repr::Bool(b) => Ok(*b),
            _ => Err(WidgetError::VariantUnreachable("expected a boolean")),
        }
    }

    pub fn as_nat(&self) -> Result<u64> {
        match &*self.0 {
            Repr::Nat(n) => Ok(*n),
            _ => Err(WidgetError::VariantUnreachable("expected a natural")),
        }
    }

    /// Decode the option encoding.
    pub fn as_option(&self) -> Result<Option<HostValue>> {
        match self.variant_tag()? {
            0 => Ok(None),
            1 => Ok(Some(self.field(0)?)),
            _ => Err(WidgetError::VariantUnreachable("expected an option")),
        }
    }

    /// Decode the pair encoding.
    pub fn pair_fields(&self) -> Result<(HostValue, HostValue)> {
        Ok((self.field(0)?, self.field(1)?))
    }

    /// Decode the list encoding into a vector.
    pub fn as_list(&self) -> Result<Vec<HostValue>> {
        let mut items = Vec::new();
        let mut cursor = self.clone();
        loop {
            match cursor.variant_tag()? {
                0 => return Ok(items),
                1 => {
                    items.push(cursor.field(0)?);
                    cursor = cursor.field(1)?;
                }
                _ => return Err(WidgetError::VariantUnreachable("expected a list")),
            }
        }
    }
}

// === Invocation, identity, hashing ===

impl HostValue {
    /// Invoke the value as a closure. Non-callable values and closures that
    /// trap surface as [`WidgetError::HostInvocationFailure`].
    pub fn invoke(&self, args: &[HostValue]) -> Result<HostValue> {
        match &*self.0 {
            Repr::Closure(f) => f(args),
            _ => Err(WidgetError::HostInvocationFailure(
                "value is not callable".into(),
            )),
        }
    }

    /// Conservative identity equality. Shared handles and equal unboxed
    /// scalars compare equal; everything else compares unequal.
    pub fn host_eq(&self, other: &HostValue) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (Repr::Bool(a), Repr::Bool(b)) => a == b,
            (Repr::Nat(a), Repr::Nat(b)) => a == b,
            _ => false,
        }
    }

    /// Deterministic-in-process hash. Closures hash by handle identity, so
    /// distinct closures that do the same thing hash differently. If any
    /// part of the value is unhashable the whole value collapses to
    /// [`UNHASHABLE_SENTINEL`].
    pub fn hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        let mut unhashable = false;
        self.hash_into(&mut hasher, &mut unhashable);
        if unhashable {
            UNHASHABLE_SENTINEL
        } else {
            hasher.finish()
        }
    }

    fn hash_into(&self, hasher: &mut FxHasher, unhashable: &mut bool) {
        match &*self.0 {
            Repr::Bool(b) => (0u8, b).hash(hasher),
            Repr::Nat(n) => (1u8, n).hash(hasher),
            Repr::Str(s) => (2u8, s).hash(hasher),
            Repr::Data { tag, fields } => {
                (3u8, tag, fields.len()).hash(hasher);
                for field in fields {
                    field.hash_into(hasher, unhashable);
                }
            }
            Repr::Closure(_) => (4u8, Rc::as_ptr(&self.0) as *const () as usize).hash(hasher),
            Repr::External { hash: Some(h) } => (5u8, h).hash(hasher),
            Repr::External { hash: None } => *unhashable = true,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Repr::Bool(b) => write!(f, "{b}"),
            Repr::Nat(n) => write!(f, "{n}"),
            Repr::Str(s) => write!(f, "{s:?}"),
            Repr::Data { tag, fields } => {
                write!(f, "#{tag}")?;
                if !fields.is_empty() {
                    f.debug_list().entries(fields).finish()?;
                }
                Ok(())
            }
            Repr::Closure(_) => write!(f, "<closure>"),
            Repr::External { .. } => write!(f, "<external>"),
        }
    }
}
