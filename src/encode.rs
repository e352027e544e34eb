//! Serialization: the type classifier and the byte emitters.
//!
//! One `Encoder` owns the output buffer for the duration of a single
//! `pack` call. Dispatch is a monomorphic match over the value's variant,
//! in the classifier's priority order; every passthrough option suppresses
//! its clause so the value falls through to the caller's `default` hook.

use crate::datetime::{format_date, format_datetime, format_naive_datetime, format_time};
use crate::error::EncodeError;
use crate::integer::{get_int_internal, IntPriv, Integer};
use crate::marker::Marker;
use crate::ndarray::{datetime64_to_naive, ArrayData};
use crate::opt::Opt;
use crate::value::{Map, Value};
use crate::{DefaultFn, MAX_DEFAULT_CALLS, MAX_DEPTH};

/// Starting size of the output buffer; it doubles on exhaustion from here.
const INITIAL_CAPACITY: usize = 4096;

pub(crate) fn encode(
    value: &Value,
    default: Option<&DefaultFn>,
    opts: Opt,
) -> Result<Vec<u8>, EncodeError> {
    let mut enc = Encoder {
        buf: Vec::with_capacity(INITIAL_CAPACITY),
        opts,
        default,
    };
    enc.encode_value(value, 0, 0)?;
    Ok(enc.buf)
}

struct Encoder<'h> {
    buf: Vec<u8>,
    opts: Opt,
    default: Option<&'h DefaultFn>,
}

impl<'h> Encoder<'h> {
    /// The classifier. `depth` counts enclosing containers and is checked
    /// wherever a new one opens; `default_calls` counts how many `default`
    /// rewrites are already on this branch.
    fn encode_value(
        &mut self,
        value: &Value,
        depth: usize,
        default_calls: u8,
    ) -> Result<(), EncodeError> {
        match value {
            Value::Null => {
                self.buf.push(Marker::Null.into());
                Ok(())
            }
            Value::Bool(v) => {
                self.write_bool(*v);
                Ok(())
            }
            Value::Int(v) => {
                self.write_int(*v);
                Ok(())
            }
            Value::F32(v) => {
                self.write_f32(*v);
                Ok(())
            }
            Value::F64(v) => {
                self.write_f64(*v);
                Ok(())
            }
            Value::Str(v) => {
                self.write_str(v);
                Ok(())
            }
            Value::Bin(v) => {
                self.write_bin(v);
                Ok(())
            }
            Value::Array(items) => self.encode_sequence(items, depth, default_calls),
            Value::Map(map) => self.encode_map(map, depth, default_calls),
            Value::Ext(ext) => {
                self.write_ext(ext.tag(), ext.data());
                Ok(())
            }
            Value::Subclass(sub) => {
                if self.opts.contains(Opt::PASSTHROUGH_SUBCLASS) {
                    return self.fall_back(value, depth, default_calls);
                }
                match sub.base {
                    // Float and tuple subclasses never get the shortcut.
                    Value::F32(_) | Value::F64(_) | Value::Tuple(_) => {
                        self.fall_back(value, depth, default_calls)
                    }
                    ref base => self.encode_value(base, depth, default_calls),
                }
            }
            Value::NdArray(arr) => {
                if !self.opts.contains(Opt::SERIALIZE_NUMPY) {
                    return self.fall_back(value, depth, default_calls);
                }
                // An array the adapter can't walk still goes to `default`
                // when there is one; the dedicated errors fire otherwise.
                match arr.validate() {
                    Ok(()) => self.write_ndarray_level(arr.shape(), arr.data(), 0, depth),
                    Err(_) if self.default.is_some() => {
                        self.fall_back(value, depth, default_calls)
                    }
                    Err(err) => Err(err),
                }
            }
            Value::Model(model) => {
                if self.opts.contains(Opt::SERIALIZE_PYDANTIC) {
                    let dumped = model.dump().map_err(|source| {
                        EncodeError::unsupported_cause(model.type_name(), source)
                    })?;
                    self.encode_value(&dumped, depth, default_calls)
                } else {
                    self.fall_back(value, depth, default_calls)
                }
            }
            Value::Record(record) => {
                if self.opts.contains(Opt::PASSTHROUGH_DATACLASS) {
                    return self.fall_back(value, depth, default_calls);
                }
                if depth >= MAX_DEPTH {
                    return Err(EncodeError::DepthExceeded);
                }
                let fields: Vec<_> = record.wire_fields().collect();
                self.write_map_header(fields.len());
                for field in fields {
                    self.write_str(field.name());
                    self.encode_value(field.value(), depth + 1, default_calls)?;
                }
                Ok(())
            }
            Value::Enum(member) => self.encode_value(member.value(), depth, default_calls),
            Value::Date(date) => {
                if self.opts.contains(Opt::PASSTHROUGH_DATETIME) {
                    return self.fall_back(value, depth, default_calls);
                }
                self.write_str(&format_date(*date));
                Ok(())
            }
            Value::Time(time) => {
                if self.opts.contains(Opt::PASSTHROUGH_DATETIME) {
                    return self.fall_back(value, depth, default_calls);
                }
                self.write_str(&format_time(time, self.opts)?);
                Ok(())
            }
            Value::DateTime(dt) => {
                if self.opts.contains(Opt::PASSTHROUGH_DATETIME) {
                    return self.fall_back(value, depth, default_calls);
                }
                self.write_str(&format_datetime(dt, self.opts));
                Ok(())
            }
            Value::Uuid(id) => {
                if self.opts.contains(Opt::PASSTHROUGH_UUID) {
                    return self.fall_back(value, depth, default_calls);
                }
                let mut text = uuid::Uuid::encode_buffer();
                self.write_str(id.hyphenated().encode_lower(&mut text));
                Ok(())
            }
            Value::Tuple(items) => {
                if self.opts.contains(Opt::PASSTHROUGH_TUPLE) {
                    return self.fall_back(value, depth, default_calls);
                }
                self.encode_sequence(items, depth, default_calls)
            }
            Value::BigInt(_) => {
                if self.opts.contains(Opt::PASSTHROUGH_BIG_INT) {
                    return self.fall_back(value, depth, default_calls);
                }
                Err(EncodeError::IntRange)
            }
            Value::Foreign(_) => self.fall_back(value, depth, default_calls),
        }
    }

    /// The miss path: hand the value to `default` and encode whatever
    /// comes back, charging the rewrite against this branch's budget.
    fn fall_back(
        &mut self,
        value: &Value,
        depth: usize,
        default_calls: u8,
    ) -> Result<(), EncodeError> {
        let Some(default) = self.default else {
            return Err(EncodeError::unsupported(value.type_name()));
        };
        if default_calls >= MAX_DEFAULT_CALLS {
            return Err(EncodeError::DefaultRecursion);
        }
        let replacement = default(value)
            .map_err(|source| EncodeError::unsupported_cause(value.type_name(), source))?;
        self.encode_value(&replacement, depth, default_calls + 1)
    }

    fn encode_sequence(
        &mut self,
        items: &[Value],
        depth: usize,
        default_calls: u8,
    ) -> Result<(), EncodeError> {
        if depth >= MAX_DEPTH {
            return Err(EncodeError::DepthExceeded);
        }
        self.write_array_header(items.len());
        for item in items {
            self.encode_value(item, depth + 1, default_calls)?;
        }
        Ok(())
    }

    fn encode_map(
        &mut self,
        map: &Map,
        depth: usize,
        default_calls: u8,
    ) -> Result<(), EncodeError> {
        if depth >= MAX_DEPTH {
            return Err(EncodeError::DepthExceeded);
        }
        if self.opts.contains(Opt::SORT_KEYS) {
            if self.opts.contains(Opt::NON_STR_KEYS) {
                return Err(EncodeError::SortNonStr);
            }
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map.iter() {
                let Value::Str(key) = key else {
                    return Err(EncodeError::NonStrKey);
                };
                entries.push((key.as_ref(), value));
            }
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            self.write_map_header(entries.len());
            for (key, value) in entries {
                self.write_str(key);
                self.encode_value(value, depth + 1, default_calls)?;
            }
            return Ok(());
        }
        self.write_map_header(map.len());
        for (key, value) in map.iter() {
            self.encode_key(key)?;
            self.encode_value(value, depth + 1, default_calls)?;
        }
        Ok(())
    }

    /// Key encoding is its own little classifier: strings always work,
    /// and `NON_STR_KEYS` admits the fixed family below. The datetime and
    /// subclass passthrough options deliberately have no effect here, and
    /// `default` is never consulted for a key.
    fn encode_key(&mut self, key: &Value) -> Result<(), EncodeError> {
        if let Value::Str(key) = key {
            self.write_str(key);
            return Ok(());
        }
        if !self.opts.contains(Opt::NON_STR_KEYS) {
            return Err(EncodeError::NonStrKey);
        }
        match key {
            Value::Int(v) => {
                self.write_int(*v);
                Ok(())
            }
            Value::BigInt(_) => Err(EncodeError::IntRange),
            Value::Bool(v) => {
                self.write_bool(*v);
                Ok(())
            }
            Value::F32(v) => {
                self.write_f32(*v);
                Ok(())
            }
            Value::F64(v) => {
                self.write_f64(*v);
                Ok(())
            }
            Value::Date(date) => {
                self.write_str(&format_date(*date));
                Ok(())
            }
            Value::Time(time) => {
                self.write_str(&format_time(time, self.opts)?);
                Ok(())
            }
            Value::DateTime(dt) => {
                self.write_str(&format_datetime(dt, self.opts));
                Ok(())
            }
            Value::Uuid(id) => {
                let mut text = uuid::Uuid::encode_buffer();
                self.write_str(id.hyphenated().encode_lower(&mut text));
                Ok(())
            }
            Value::Bin(bytes) => {
                self.write_bin(bytes);
                Ok(())
            }
            Value::Enum(member) => self.encode_key(member.value()),
            Value::Subclass(sub) if sub.base.is_str() => self.encode_key(&sub.base),
            _ => Err(EncodeError::NonStrKey),
        }
    }

    /// Emit one nesting level of a C-contiguous array. `offset` indexes
    /// into the flat storage; the stride of a level is the product of the
    /// trailing dimensions.
    fn write_ndarray_level(
        &mut self,
        shape: &[usize],
        data: &ArrayData,
        offset: usize,
        depth: usize,
    ) -> Result<(), EncodeError> {
        if depth >= MAX_DEPTH {
            return Err(EncodeError::DepthExceeded);
        }
        let (&dim, rest) = shape.split_first().expect("rank checked by validate");
        self.write_array_header(dim);
        if rest.is_empty() {
            return self.write_ndarray_scalars(data, offset, dim);
        }
        let stride: usize = rest.iter().product();
        for i in 0..dim {
            self.write_ndarray_level(rest, data, offset + i * stride, depth + 1)?;
        }
        Ok(())
    }

    fn write_ndarray_scalars(
        &mut self,
        data: &ArrayData,
        offset: usize,
        count: usize,
    ) -> Result<(), EncodeError> {
        let range = offset..offset + count;
        match data {
            ArrayData::I8(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::I16(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::I32(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::I64(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::U8(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::U16(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::U32(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            ArrayData::U64(v) => v[range].iter().for_each(|&n| self.write_int(n.into())),
            // Half floats widen; there is no 16-bit wire float.
            ArrayData::F16(v) => v[range].iter().for_each(|&n| self.write_f32(n.to_f32())),
            ArrayData::F32(v) => v[range].iter().for_each(|&n| self.write_f32(n)),
            ArrayData::F64(v) => v[range].iter().for_each(|&n| self.write_f64(n)),
            ArrayData::Bool(v) => v[range].iter().for_each(|&b| self.write_bool(b)),
            ArrayData::DateTime64(unit, v) => {
                for &ticks in &v[range] {
                    let naive = datetime64_to_naive(*unit, ticks)?;
                    self.write_str(&format_naive_datetime(naive, self.opts));
                }
            }
            ArrayData::Unsupported { .. } => unreachable!("rejected by validate"),
        }
        Ok(())
    }

    fn write_bool(&mut self, v: bool) {
        self.buf
            .push(if v { Marker::True } else { Marker::False }.into());
    }

    /// Integers use the shortest format their range allows; the choice is
    /// keyed on the value alone.
    fn write_int(&mut self, v: Integer) {
        match get_int_internal(&v) {
            IntPriv::PosInt(v) => {
                if v <= 127 {
                    self.buf.push(Marker::PosFixInt(v as u8).into());
                } else if v <= u8::MAX as u64 {
                    self.buf.push(Marker::UInt8.into());
                    self.buf.push(v as u8);
                } else if v <= u16::MAX as u64 {
                    self.buf.push(Marker::UInt16.into());
                    self.buf.extend_from_slice(&(v as u16).to_be_bytes());
                } else if v <= u32::MAX as u64 {
                    self.buf.push(Marker::UInt32.into());
                    self.buf.extend_from_slice(&(v as u32).to_be_bytes());
                } else {
                    self.buf.push(Marker::UInt64.into());
                    self.buf.extend_from_slice(&v.to_be_bytes());
                }
            }
            IntPriv::NegInt(v) => {
                if v >= -32 {
                    self.buf.push(Marker::NegFixInt(v as i8).into());
                } else if v >= i8::MIN as i64 {
                    self.buf.push(Marker::Int8.into());
                    self.buf.push(v as u8);
                } else if v >= i16::MIN as i64 {
                    self.buf.push(Marker::Int16.into());
                    self.buf.extend_from_slice(&(v as i16).to_be_bytes());
                } else if v >= i32::MIN as i64 {
                    self.buf.push(Marker::Int32.into());
                    self.buf.extend_from_slice(&(v as i32).to_be_bytes());
                } else {
                    self.buf.push(Marker::Int64.into());
                    self.buf.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
    }

    /// NaN and infinities go out with their exact bit pattern.
    fn write_f32(&mut self, v: f32) {
        self.buf.push(Marker::F32.into());
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.push(Marker::F64.into());
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    fn write_str(&mut self, v: &str) {
        let len = v.len();
        assert!(len <= u32::MAX as usize);
        if len <= 31 {
            self.buf.push(Marker::FixStr(len as u8).into());
        } else if len <= u8::MAX as usize {
            self.buf.push(Marker::Str8.into());
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(Marker::Str16.into());
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(Marker::Str32.into());
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(v.as_bytes());
    }

    fn write_bin(&mut self, v: &[u8]) {
        let len = v.len();
        assert!(len <= u32::MAX as usize);
        if len <= u8::MAX as usize {
            self.buf.push(Marker::Bin8.into());
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(Marker::Bin16.into());
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(Marker::Bin32.into());
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(v);
    }

    fn write_array_header(&mut self, len: usize) {
        assert!(len <= u32::MAX as usize);
        if len <= 15 {
            self.buf.push(Marker::FixArray(len as u8).into());
        } else if len <= u16::MAX as usize {
            self.buf.push(Marker::Array16.into());
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(Marker::Array32.into());
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    fn write_map_header(&mut self, len: usize) {
        assert!(len <= u32::MAX as usize);
        if len <= 15 {
            self.buf.push(Marker::FixMap(len as u8).into());
        } else if len <= u16::MAX as usize {
            self.buf.push(Marker::Map16.into());
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(Marker::Map32.into());
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    /// Fixext when the payload length matches one exactly, else the
    /// smallest variable ext.
    fn write_ext(&mut self, tag: i8, data: &[u8]) {
        let len = data.len();
        assert!(len <= u32::MAX as usize);
        match len {
            1 => self.buf.push(Marker::FixExt1.into()),
            2 => self.buf.push(Marker::FixExt2.into()),
            4 => self.buf.push(Marker::FixExt4.into()),
            8 => self.buf.push(Marker::FixExt8.into()),
            16 => self.buf.push(Marker::FixExt16.into()),
            _ => {
                if len <= u8::MAX as usize {
                    self.buf.push(Marker::Ext8.into());
                    self.buf.push(len as u8);
                } else if len <= u16::MAX as usize {
                    self.buf.push(Marker::Ext16.into());
                    self.buf.extend_from_slice(&(len as u16).to_be_bytes());
                } else {
                    self.buf.push(Marker::Ext32.into());
                    self.buf.extend_from_slice(&(len as u32).to_be_bytes());
                }
            }
        }
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(data);
    }
}
