//! The numeric-array adapted family: N-dimensional, C-contiguous element
//! storage encoded as nested arrays without materialising the nesting.

use chrono::NaiveDateTime;
use half::f16;

use crate::error::EncodeError;

/// Tick unit of a datetime64 element.
///
/// Only the absolute-time units (days through nanoseconds) have a wire
/// mapping; calendar units and sub-nanosecond resolutions fail to encode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    Picoseconds,
    Femtoseconds,
    Attoseconds,
}

/// The sentinel numpy stores for "not a time".
pub(crate) const NAT: i64 = i64::MIN;

/// Convert datetime64 ticks into a naive UTC date-time.
///
/// Sub-microsecond precision survives here as nanoseconds and is truncated
/// later by the text writer.
pub(crate) fn datetime64_to_naive(unit: TimeUnit, ticks: i64) -> Result<NaiveDateTime, EncodeError> {
    use TimeUnit::*;
    if ticks == NAT {
        return Err(EncodeError::NumpyDatetime("NaT is not supported"));
    }
    let (secs, nanos) = match unit {
        Days => (ticks.checked_mul(86_400), 0u32),
        Hours => (ticks.checked_mul(3_600), 0),
        Minutes => (ticks.checked_mul(60), 0),
        Seconds => (Some(ticks), 0),
        Milliseconds => (
            Some(ticks.div_euclid(1_000)),
            ticks.rem_euclid(1_000) as u32 * 1_000_000,
        ),
        Microseconds => (
            Some(ticks.div_euclid(1_000_000)),
            ticks.rem_euclid(1_000_000) as u32 * 1_000,
        ),
        Nanoseconds => (
            Some(ticks.div_euclid(1_000_000_000)),
            ticks.rem_euclid(1_000_000_000) as u32,
        ),
        Years | Months | Weeks | Picoseconds | Femtoseconds | Attoseconds => {
            return Err(EncodeError::NumpyDatetime("unit has no wire mapping"));
        }
    };
    secs.and_then(|secs| chrono::DateTime::from_timestamp(secs, nanos))
        .map(|dt| dt.naive_utc())
        .ok_or(EncodeError::NumpyDatetime("value out of range"))
}

/// Flat element storage for one array, tagged by element type.
///
/// `Unsupported` lets the binding hand over an array of an exotic dtype so
/// the adapter can fail with the dedicated error instead of a generic one.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    DateTime64(TimeUnit, Vec<i64>),
    Unsupported {
        /// The dtype's name, reported verbatim in the error.
        dtype: String,
    },
}

impl ArrayData {
    /// Number of stored elements, or `None` for an unsupported dtype.
    pub fn len(&self) -> Option<usize> {
        use self::ArrayData::*;
        match self {
            I8(v) => Some(v.len()),
            I16(v) => Some(v.len()),
            I32(v) => Some(v.len()),
            I64(v) => Some(v.len()),
            U8(v) => Some(v.len()),
            U16(v) => Some(v.len()),
            U32(v) => Some(v.len()),
            U64(v) => Some(v.len()),
            F16(v) => Some(v.len()),
            F32(v) => Some(v.len()),
            F64(v) => Some(v.len()),
            Bool(v) => Some(v.len()),
            DateTime64(_, v) => Some(v.len()),
            Unsupported { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// An N-dimensional numeric array: a shape plus row-major element storage.
///
/// Only C-contiguous storage can be walked by the adapter; arrays handed
/// over in Fortran order (or as strided views) must keep their flag false
/// so the encoder can reject them with the conversion hint.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    c_contiguous: bool,
    data: ArrayData,
}

impl NdArray {
    /// A C-contiguous array of the given shape.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Self {
        Self {
            shape,
            c_contiguous: true,
            data,
        }
    }

    /// An array whose storage is not in C order.
    pub fn non_contiguous(shape: Vec<usize>, data: ArrayData) -> Self {
        Self {
            shape,
            c_contiguous: false,
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn is_c_contiguous(&self) -> bool {
        self.c_contiguous
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Total element count implied by the shape.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check the rules shared by every dtype before the encoder walks the
    /// storage: rank >= 1, C order, supported dtype, and storage that
    /// actually holds `shape` worth of elements.
    pub(crate) fn validate(&self) -> Result<(), EncodeError> {
        if self.rank() == 0 {
            return Err(EncodeError::NumpyZeroDim);
        }
        if !self.c_contiguous {
            return Err(EncodeError::NumpyNotContiguous);
        }
        match self.data.len() {
            None => {
                let ArrayData::Unsupported { dtype } = &self.data else {
                    unreachable!()
                };
                Err(EncodeError::NumpyDtype(dtype.clone()))
            }
            // A length mismatch means the storage is a strided view of
            // something else, which is the same failure as Fortran order.
            Some(len) if len != self.element_count() => Err(EncodeError::NumpyNotContiguous),
            Some(_) => Ok(()),
        }
    }
}
