use std::fmt;

/// A field value.
///
/// Fields carry their concrete representation along with them, so that a transform which rewrites a value can hand
/// back the same representation it was given. The numeric variants cover signed and unsigned integers and floating
/// point numbers at both 32 and 64 bits of width. Everything else is non-numeric.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A 32-bit signed integer.
    I32(i32),

    /// A 64-bit signed integer.
    I64(i64),

    /// A 32-bit unsigned integer.
    U32(u32),

    /// A 64-bit unsigned integer.
    U64(u64),

    /// A 32-bit floating point number.
    F32(f32),

    /// A 64-bit floating point number.
    F64(f64),

    /// A boolean.
    Bool(bool),

    /// A string.
    String(String),
}

impl FieldValue {
    /// Returns the name of the value's concrete kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
        }
    }

    /// Returns `true` if the value is one of the numeric kinds.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Bool(_) | Self::String(_))
    }

    /// Returns `true` unless the value is a floating point number that is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::F32(value) => value.is_finite(),
            Self::F64(value) => value.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(value) => write!(f, "{}", value),
            Self::I64(value) => write!(f, "{}", value),
            Self::U32(value) => write!(f, "{}", value),
            Self::U64(value) => write!(f, "{}", value),
            Self::F32(value) => write!(f, "{}", value),
            Self::F64(value) => write!(f, "{}", value),
            Self::Bool(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{:?}", value),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

impl_from_primitive!(
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
);

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
