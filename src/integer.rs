use std::convert::TryFrom;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IntPriv {
    /// Always non-less than zero.
    PosInt(u64),
    /// Always less than zero.
    NegInt(i64),
}

/// An integer in the MessagePack wire range, whether signed or unsigned.
///
/// Covers the union of the i64 and u64 ranges. A `Value` containing an
/// integer can be constructed using the `From` trait; integers outside this
/// range live in `Value::BigInt` and never reach the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Integer {
    n: IntPriv,
}

impl Integer {
    /// Returns the integer represented as `i64` if possible, or else `None`.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            IntPriv::PosInt(n) => i64::try_from(n).ok(),
            IntPriv::NegInt(n) => Some(n),
        }
    }

    /// Returns the integer represented as `u64` if possible, or else `None`.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            IntPriv::PosInt(n) => Some(n),
            IntPriv::NegInt(..) => None,
        }
    }

    /// Returns the integer represented as `f64`.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self.n {
            IntPriv::PosInt(n) => n as f64,
            IntPriv::NegInt(n) => n as f64,
        }
    }
}

pub(crate) fn get_int_internal(val: &Integer) -> IntPriv {
    val.n
}

macro_rules! impl_from_unsigned {
    ($t: ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                Integer {
                    n: IntPriv::PosInt(n as u64),
                }
            }
        }
    };
}

macro_rules! impl_from_signed {
    ($t: ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                if n < 0 {
                    Integer {
                        n: IntPriv::NegInt(n as i64),
                    }
                } else {
                    Integer {
                        n: IntPriv::PosInt(n as u64),
                    }
                }
            }
        }
    };
}

impl_from_unsigned!(u8);
impl_from_unsigned!(u16);
impl_from_unsigned!(u32);
impl_from_unsigned!(u64);
impl_from_unsigned!(usize);
impl_from_signed!(i8);
impl_from_signed!(i16);
impl_from_signed!(i32);
impl_from_signed!(i64);
impl_from_signed!(isize);

/// Fails when the value is outside the i64/u64 union; the caller decides
/// between `Value::BigInt` and an error.
impl TryFrom<i128> for Integer {
    type Error = i128;
    fn try_from(n: i128) -> Result<Self, Self::Error> {
        if n < 0 {
            i64::try_from(n).map(Integer::from).map_err(|_| n)
        } else {
            u64::try_from(n).map(Integer::from).map_err(|_| n)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(Integer::from(-1i64).as_i64(), Some(-1));
        assert_eq!(Integer::from(-1i64).as_u64(), None);
        assert_eq!(
            Integer::from(i64::MAX as u64).as_i64(),
            Some(i64::MAX)
        );
        assert_eq!(Integer::from(i64::MAX as u64 + 1).as_i64(), None);
        assert_eq!(Integer::from(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Integer::from(42u8).as_f64(), 42.0);
        assert_eq!(Integer::from(-3i8).as_f64(), -3.0);
    }

    #[test]
    fn from_i128() {
        assert_eq!(
            Integer::try_from(-1i128).unwrap(),
            Integer::from(-1i64)
        );
        assert_eq!(
            Integer::try_from(u64::MAX as i128).unwrap(),
            Integer::from(u64::MAX)
        );
        assert!(Integer::try_from(u64::MAX as i128 + 1).is_err());
        assert!(Integer::try_from(i64::MIN as i128 - 1).is_err());
    }
}
