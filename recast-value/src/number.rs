use core::cmp::Ordering;
use core::fmt::{self, Debug, Display, Formatter};

/// A numeric value.
///
/// Integers that fit an `i64` are always stored as `I64`, so two numbers
/// holding the same integer compare equal no matter how they were built.
#[derive(Clone, Copy)]
pub struct VNumber(Repr);

#[derive(Clone, Copy)]
enum Repr {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl VNumber {
    /// Creates a number from an i64.
    #[must_use]
    pub const fn from_i64(v: i64) -> Self {
        Self(Repr::I64(v))
    }

    /// Creates a number from a u64.
    #[must_use]
    pub const fn from_u64(v: u64) -> Self {
        if v <= i64::MAX as u64 {
            Self(Repr::I64(v as i64))
        } else {
            Self(Repr::U64(v))
        }
    }

    /// Creates a number from an f64.
    ///
    /// Returns `None` if the value is NaN or infinite.
    #[must_use]
    pub fn from_f64(v: f64) -> Option<Self> {
        v.is_finite().then_some(Self(Repr::F64(v)))
    }

    /// Converts to i64 if it can be represented exactly.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        match self.0 {
            Repr::I64(v) => Some(v),
            Repr::U64(_) => None,
            Repr::F64(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
    }

    /// Converts to u64 if it can be represented exactly.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        match self.0 {
            Repr::I64(v) => u64::try_from(v).ok(),
            Repr::U64(v) => Some(v),
            Repr::F64(f) => {
                if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 {
                    Some(f as u64)
                } else {
                    None
                }
            }
        }
    }

    /// Converts to f64 if it can be represented without loss.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self.0 {
            Repr::I64(v) => {
                let f = v as f64;
                (f as i64 == v).then_some(f)
            }
            Repr::U64(v) => {
                let f = v as f64;
                (f as u64 == v).then_some(f)
            }
            Repr::F64(f) => Some(f),
        }
    }

    /// Converts to f64, rounding if necessary.
    #[must_use]
    pub fn to_f64_lossy(&self) -> f64 {
        match self.0 {
            Repr::I64(v) => v as f64,
            Repr::U64(v) => v as f64,
            Repr::F64(f) => f,
        }
    }

    /// Returns true if this number was created from a float.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self.0, Repr::F64(_))
    }

    /// Returns true if this number is an integer.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl PartialEq for VNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (Repr::I64(a), Repr::I64(b)) => a == b,
            (Repr::U64(a), Repr::U64(b)) => a == b,
            (Repr::F64(a), Repr::F64(b)) => a == b,
            _ => self.partial_cmp(other) == Some(Ordering::Equal),
        }
    }
}

impl PartialOrd for VNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.0, other.0) {
            (Repr::I64(a), Repr::I64(b)) => Some(a.cmp(&b)),
            (Repr::U64(a), Repr::U64(b)) => Some(a.cmp(&b)),
            (Repr::I64(_), Repr::U64(_)) => Some(Ordering::Less),
            (Repr::U64(_), Repr::I64(_)) => Some(Ordering::Greater),
            _ => self.to_f64_lossy().partial_cmp(&other.to_f64_lossy()),
        }
    }
}

impl Debug for VNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for VNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::I64(v) => write!(f, "{v}"),
            Repr::U64(v) => write!(f, "{v}"),
            // keep a fractional marker so floats never read back as integers
            Repr::F64(v) if v.fract() == 0.0 && v.abs() < 1e16 => write!(f, "{v:.1}"),
            Repr::F64(v) => write!(f, "{v}"),
        }
    }
}

impl Default for VNumber {
    fn default() -> Self {
        Self::from_i64(0)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty => $ctor:ident),* $(,)?) => {
        $(
            impl From<$ty> for VNumber {
                fn from(v: $ty) -> Self {
                    Self::$ctor(v as _)
                }
            }
        )*
    };
}

impl_from_int! {
    i8 => from_i64,
    i16 => from_i64,
    i32 => from_i64,
    i64 => from_i64,
    u8 => from_i64,
    u16 => from_i64,
    u32 => from_i64,
    u64 => from_u64,
    usize => from_u64,
}

impl TryFrom<f64> for VNumber {
    type Error = f64;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::from_f64(v).ok_or(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_unsigned_is_stored_as_signed() {
        assert_eq!(VNumber::from_u64(7), VNumber::from_i64(7));
        assert_eq!(VNumber::from_u64(u64::MAX).to_i64(), None);
        assert_eq!(VNumber::from_u64(u64::MAX).to_u64(), Some(u64::MAX));
    }

    #[test]
    fn integral_floats_convert_exactly() {
        let n = VNumber::from_f64(3.0).unwrap();
        assert_eq!(n.to_i64(), Some(3));
        assert!(n.is_float());
        assert_eq!(VNumber::from_f64(3.5).unwrap().to_i64(), None);
        assert!(VNumber::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn floats_render_with_fraction() {
        assert_eq!(VNumber::from_f64(2.0).unwrap().to_string(), "2.0");
        assert_eq!(VNumber::from_f64(0.25).unwrap().to_string(), "0.25");
        assert_eq!(VNumber::from_i64(-4).to_string(), "-4");
    }
}
