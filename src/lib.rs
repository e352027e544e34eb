//! Strict MessagePack codec for dynamically-typed value trees.
//!
//! This crate is the core of a two-call codec: [`pack`] walks a [`Value`]
//! tree and produces MessagePack bytes, [`unpack`] parses MessagePack
//! bytes back into a [`Value`] tree. It is strict in both directions —
//! unknown types don't silently degrade on encode, malformed bytes never
//! produce partial values on decode — and it understands more than the
//! wire format's native universe: dates, times and date-times (as ISO-8601
//! text), UUIDs, structured records, model records, enumerations, and
//! N-dimensional numeric arrays.
//!
//! ```
//! use strictpack::{pack, unpack, Map, Value};
//!
//! let mut map = Map::new();
//! map.insert("answer", 42u8);
//! let bytes = pack(&Value::Map(map), None, None).unwrap();
//! let value = unpack(&bytes, None, None).unwrap();
//! assert_eq!(value.as_map().unwrap().get("answer"), Some(&Value::from(42u8)));
//! ```
//!
//! Behavior is tuned through the [`Opt`] bitfield: permissive map keys,
//! sorted map keys, UTC handling for naive date-times, and a family of
//! `PASSTHROUGH_*` bits that suppress a built-in encoding so the caller's
//! `default` hook sees the value instead. Extension types round-trip
//! through the [`Ext`] carrier on encode and the caller's `ext_hook` on
//! decode.
//!
//! Both entry points are synchronous, share no per-call state, and may be
//! called concurrently from any number of threads.

mod datetime;
mod decode;
mod encode;
mod error;
mod ext;
mod integer;
mod intern;
mod marker;
mod ndarray;
mod opt;
mod record;
mod value;

pub use self::error::{DecodeError, EncodeError, HookError};
pub use self::ext::Ext;
pub use self::integer::Integer;
pub use self::ndarray::{ArrayData, NdArray, TimeUnit};
pub use self::opt::Opt;
pub use self::record::{EnumValue, Field, FieldKind, ModelDump, ModelHandle, Record};
pub use self::value::{DateTime, Foreign, Map, Subclass, Time, Value};

/// Deepest container nesting either pipeline will walk.
pub const MAX_DEPTH: usize = 1024;

/// How many chained `default` rewrites one branch of the tree may consume.
pub(crate) const MAX_DEFAULT_CALLS: u8 = 254;

/// The fallback hook for values the classifier can't place: it receives
/// the unencodable value and returns a replacement, which is encoded in
/// its stead. Returning an error aborts the encode with the error attached
/// as the cause of [`EncodeError::UnsupportedType`].
pub type DefaultFn = dyn Fn(&Value) -> Result<Value, HookError>;

/// The constructor for decoded extension values: receives the tag and the
/// raw payload, returns whatever value should stand in for them. Errors
/// abort the decode as [`DecodeError::ExtHookFailed`].
pub type ExtHookFn = dyn Fn(i8, &[u8]) -> Result<Value, HookError>;

/// Serialize `value` to MessagePack bytes.
///
/// `option` is a raw [`Opt`] bitfield (pass `Some(opt.bits() as u64)` or a
/// hand-assembled integer); bits outside the defined set fail with
/// [`EncodeError::BadOption`]. `default` is consulted for every value the
/// classifier can't place.
pub fn pack(
    value: &Value,
    default: Option<&DefaultFn>,
    option: Option<u64>,
) -> Result<Vec<u8>, EncodeError> {
    let opts = opt::encode_opts(option)?;
    encode::encode(value, default, opts)
}

/// Deserialize one MessagePack value from `buf`.
///
/// The entire buffer must be consumed; trailing bytes are malformed input.
/// `option` accepts only [`Opt::NON_STR_KEYS`]. Extension values require
/// an `ext_hook`.
pub fn unpack(
    buf: &[u8],
    ext_hook: Option<&ExtHookFn>,
    option: Option<u64>,
) -> Result<Value, DecodeError> {
    let opts = opt::decode_opts(option)?;
    decode::decode(buf, ext_hook, opts)
}
