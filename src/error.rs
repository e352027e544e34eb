//! Library error types.
//!
//! Both pipelines fail fast: every error is fatal to the current call and
//! nothing is retried. Callers classify failures by variant, never by
//! message text.

use thiserror::Error;

/// The error type produced by the `default` and `ext_hook` callables.
///
/// Hook failures propagate out of the codec wrapped in the appropriate
/// [`EncodeError`] or [`DecodeError`] variant, with the original error
/// attached as the source.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An encoding failure. Returned by [`pack`][crate::pack].
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No strategy matched and `default` either was absent, failed, or
    /// returned nothing encodable.
    #[error("Type is not msgpack serializable: {type_name}")]
    UnsupportedType {
        /// Name of the offending type.
        type_name: String,
        /// The `default` hook's own failure, when there was one.
        #[source]
        source: Option<HookError>,
    },
    /// Integer outside the \[-2^63, 2^64-1\] wire range.
    #[error("Integer exceeds 64-bit range")]
    IntRange,
    /// Map key was not a string and `NON_STR_KEYS` is not set, or is a
    /// type that `NON_STR_KEYS` does not admit either.
    #[error("Dict key must be str")]
    NonStrKey,
    /// `SORT_KEYS` cannot order keys that aren't strings.
    #[error("OPT_NON_STR_KEYS is not compatible with OPT_SORT_KEYS")]
    SortNonStr,
    /// Value tree deeper than the codec is willing to walk.
    #[error("Recursion limit reached")]
    DepthExceeded,
    /// A chain of `default` calls never produced an encodable value.
    #[error("default serializer exceeds recursion limit")]
    DefaultRecursion,
    /// `Time` values carrying an offset have no wire form.
    #[error("datetime.time must not have tzinfo set")]
    AwareTime,
    /// Rank-0 numeric arrays are not sequences.
    #[error("numpy array is 0-dimensional; cannot be serialized")]
    NumpyZeroDim,
    /// The adapter walks raw element storage, so only C order works.
    #[error("numpy array is not C contiguous; use ndarray.tolist() in default")]
    NumpyNotContiguous,
    /// Element type the adapter has no wire mapping for.
    #[error("unsupported numpy dtype: {0}")]
    NumpyDtype(String),
    /// datetime64 unit without a conversion, or the NaT sentinel.
    #[error("unsupported numpy datetime64: {0}")]
    NumpyDatetime(&'static str),
    /// Option bits outside the defined set.
    #[error("Invalid opts: {0:#x}")]
    BadOption(u64),
}

impl EncodeError {
    pub(crate) fn unsupported(type_name: &str) -> Self {
        EncodeError::UnsupportedType {
            type_name: type_name.to_string(),
            source: None,
        }
    }

    pub(crate) fn unsupported_cause(type_name: &str, source: HookError) -> Self {
        EncodeError::UnsupportedType {
            type_name: type_name.to_string(),
            source: Some(source),
        }
    }
}

/// A decoding failure. Returned by [`unpack`][crate::unpack].
///
/// This is the codec's rendition of a value error: the input bytes did not
/// describe a value this decoder will produce.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reserved or contextually impossible format byte, or garbage where
    /// a value was required.
    #[error("unpack() received malformed input: {0}")]
    Malformed(&'static str),
    /// Input ended before the announced payload did.
    #[error("input ended early: needed {expected} more bytes on step [{step}], had {actual}")]
    Truncated {
        /// What the decoder was reading when the input ran out.
        step: &'static str,
        /// Bytes still required.
        expected: usize,
        /// Bytes actually remaining.
        actual: usize,
    },
    /// A str payload that is not valid UTF-8.
    #[error("str is not valid UTF-8")]
    InvalidUtf8,
    /// More nested containers than the work stack permits.
    #[error("recursion limit reached while unpacking")]
    DepthExceeded,
    /// Map key was not a string and `NON_STR_KEYS` is not set.
    #[error("map key must be str")]
    NonStrKey,
    /// An ext value was found but no `ext_hook` was supplied.
    #[error("ext type {0} is not supported")]
    UnsupportedExt(i8),
    /// The supplied `ext_hook` itself failed.
    #[error("ext_hook failed")]
    ExtHookFailed(#[source] HookError),
    /// Option bits other than `NON_STR_KEYS`.
    #[error("Invalid opts: {0:#x}")]
    BadOption(u64),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages() {
        let err = EncodeError::unsupported("Custom");
        assert_eq!(err.to_string(), "Type is not msgpack serializable: Custom");
        assert_eq!(
            EncodeError::DefaultRecursion.to_string(),
            "default serializer exceeds recursion limit"
        );
        assert_eq!(
            EncodeError::NumpyNotContiguous.to_string(),
            "numpy array is not C contiguous; use ndarray.tolist() in default"
        );
    }

    #[test]
    fn sources() {
        use std::error::Error;
        let cause: HookError = "boom".into();
        let err = EncodeError::unsupported_cause("Custom", cause);
        assert!(err.source().is_some());
        let err = DecodeError::ExtHookFailed("boom".into());
        assert!(err.source().is_some());
        assert!(DecodeError::NonStrKey.source().is_none());
    }
}
