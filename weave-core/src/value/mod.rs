//! Values
//!
//! Everything the engine observes or hands back is a [`Value`]. Primitive
//! variants are copied around freely; structured variants are handles:
//!
//! - [`Object`] is a raw observed value (record, list, map or set). Reading
//!   or writing it directly never tracks or triggers anything.
//! - [`Reactive`] is an interception wrapper around exactly one `Object`.
//! - [`Ref`] is a single-slot observable box.
//!
//! # Equality
//!
//! `Value` equality is SameValueZero: numbers compare numerically except
//! that `NaN` equals `NaN` (and `-0` equals `+0`), strings compare by
//! content, and every handle compares by identity. The same relation backs
//! `Hash`, so values can key maps and sets, and [`has_changed`] is simply
//! its negation.

mod json;
mod object;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub use object::{Object, ObjectId, ShapeKind, WeakObject};
pub(crate) use object::{property_name, ListKey};

use crate::proxy::Reactive;
use crate::reactive::Ref;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Object(Object),
    Reactive(Reactive),
    Ref(Ref),
}

/// The raw type tag of a value, as reported by [`raw_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
    Map,
    Set,
    Ref,
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RawType::Undefined => "Undefined",
            RawType::Null => "Null",
            RawType::Boolean => "Boolean",
            RawType::Number => "Number",
            RawType::String => "String",
            RawType::Object => "Object",
            RawType::Array => "Array",
            RawType::Map => "Map",
            RawType::Set => "Set",
            RawType::Ref => "Ref",
        };
        f.write_str(name)
    }
}

/// Whether `value` is structured (a raw object or a wrapper).
pub fn is_object(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Reactive(_))
}

/// Whether replacing `old` with `new` counts as a change.
///
/// Identical values do not, and neither does `NaN` replacing `NaN`.
pub fn has_changed(old: &Value, new: &Value) -> bool {
    old != new
}

/// Classify a value. Wrappers report the type of their raw value.
pub fn raw_type(value: &Value) -> RawType {
    let shape = match value {
        Value::Undefined => return RawType::Undefined,
        Value::Null => return RawType::Null,
        Value::Bool(_) => return RawType::Boolean,
        Value::Number(_) => return RawType::Number,
        Value::Str(_) => return RawType::String,
        Value::Ref(_) => return RawType::Ref,
        Value::Object(object) => object.kind(),
        Value::Reactive(proxy) => proxy.kind(),
    };
    shape_type(shape)
}

fn shape_type(shape: ShapeKind) -> RawType {
    match shape {
        ShapeKind::Record => RawType::Object,
        ShapeKind::List => RawType::Array,
        ShapeKind::Map => RawType::Map,
        ShapeKind::Set => RawType::Set,
    }
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// Truthiness with the usual scripting rules: `undefined`, `null`,
    /// `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Reactive(_) | Value::Ref(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an `i64`, if it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    /// The number as a list length, if it is a non-negative integer no
    /// larger than [`MAX_LIST_LEN`].
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_LIST_LEN as f64 => {
                Some(*n as usize)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_ref_box(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// The raw form of this value: a wrapper becomes the object it wraps,
    /// anything else is returned unchanged.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Reactive(proxy) => Value::Object(proxy.raw().clone()),
            other => other.clone(),
        }
    }

    /// The raw object behind a structured value.
    pub fn raw_object(&self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(object.clone()),
            Value::Reactive(proxy) => Some(proxy.raw().clone()),
            _ => None,
        }
    }

    /// Strict equality: like `==` except that `NaN` never equals anything.
    pub fn strict_equals(&self, other: &Value) -> bool {
        !self.is_nan() && self == other
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                // +0 and -0 are equal, and so are all NaNs.
                let bits = if *n == 0.0 {
                    0
                } else if n.is_nan() {
                    f64::NAN.to_bits()
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::Str(s) => s.hash(state),
            Value::Object(object) => object.id().hash(state),
            Value::Reactive(proxy) => proxy.addr().hash(state),
            Value::Ref(r) => r.addr().hash(state),
        }
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        matches!(self, Value::Number(n) if *n == f64::from(*other))
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        *self == Value::Number(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Value::Bool(b) if b == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Value::Str(s) if &**s == *other)
    }
}

/// Longest list a wrapper will grow to. Element indexes stay below it.
pub const MAX_LIST_LEN: usize = u32::MAX as usize;

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Object(object) => write!(f, "[object {}]", shape_type(object.kind())),
            Value::Reactive(proxy) => write!(f, "[object {}]", shape_type(proxy.kind())),
            Value::Ref(_) => f.write_str("[object Ref]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Reactive(proxy) => fmt::Debug::fmt(proxy, f),
            Value::Ref(r) => fmt::Debug::fmt(r, f),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<&Object> for Value {
    fn from(object: &Object) -> Self {
        Value::Object(object.clone())
    }
}

impl From<Reactive> for Value {
    fn from(proxy: Reactive) -> Self {
        Value::Reactive(proxy)
    }
}

impl From<&Reactive> for Value {
    fn from(proxy: &Reactive) -> Self {
        Value::Reactive(proxy.clone())
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<&Ref> for Value {
    fn from(r: &Ref) -> Self {
        Value::Ref(r.clone())
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Undefined, Into::into)
    }
}
