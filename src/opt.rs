//! Option bits accepted by [`pack`][crate::pack] and [`unpack`][crate::unpack].

use bitflags::bitflags;

use crate::error::{DecodeError, EncodeError};

bitflags! {
    /// Behavior flags for the codec.
    ///
    /// The numeric values are part of the public contract and never change.
    /// `pack` accepts any combination of the defined bits; `unpack` accepts
    /// only [`Opt::NON_STR_KEYS`]. The full set fits in 14 bit positions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Opt: u32 {
        /// Permit non-string map keys on both encode and decode.
        const NON_STR_KEYS = 1;
        /// Assume naive date-times are UTC and emit a `+00:00` suffix.
        const NAIVE_UTC = 1 << 1;
        /// Drop the microsecond field from date-time and time text.
        const OMIT_MICROSECONDS = 1 << 2;
        /// Route integers outside the i64/u64 range to `default`.
        const PASSTHROUGH_BIG_INT = 1 << 3;
        /// Route structured records to `default`.
        const PASSTHROUGH_DATACLASS = 1 << 4;
        /// Route date, time, and date-time values to `default`.
        const PASSTHROUGH_DATETIME = 1 << 5;
        /// Disable the primitive-subclass fast path.
        const PASSTHROUGH_SUBCLASS = 1 << 6;
        /// Route tuples to `default` instead of emitting them as arrays.
        const PASSTHROUGH_TUPLE = 1 << 7;
        /// Route UUID values to `default`.
        const PASSTHROUGH_UUID = 1 << 8;
        /// Enable the numeric-array adapter.
        const SERIALIZE_NUMPY = 1 << 9;
        /// Enable the model-record adapter.
        const SERIALIZE_PYDANTIC = 1 << 10;
        /// Emit map entries in byte-lexicographic key order.
        const SORT_KEYS = 1 << 11;
        /// Emit `Z` instead of `+00:00` for UTC offsets.
        const UTC_Z = 1 << 12;
    }
}

/// Validate a raw option integer for `pack`. Any bit outside the defined
/// set, or a value past the 32-bit field, is rejected.
pub(crate) fn encode_opts(raw: Option<u64>) -> Result<Opt, EncodeError> {
    let Some(raw) = raw else {
        return Ok(Opt::empty());
    };
    u32::try_from(raw)
        .ok()
        .and_then(Opt::from_bits)
        .ok_or(EncodeError::BadOption(raw))
}

/// Validate a raw option integer for `unpack`, where only `NON_STR_KEYS`
/// is meaningful.
pub(crate) fn decode_opts(raw: Option<u64>) -> Result<Opt, DecodeError> {
    let opts = match raw {
        None => Opt::empty(),
        Some(raw) => u32::try_from(raw)
            .ok()
            .and_then(Opt::from_bits)
            .ok_or(DecodeError::BadOption(raw))?,
    };
    if !(opts - Opt::NON_STR_KEYS).is_empty() {
        return Err(DecodeError::BadOption(raw.unwrap_or(0)));
    }
    Ok(opts)
}
