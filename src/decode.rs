//! Deserialization: a marker-dispatched parser with an explicit container
//! stack.
//!
//! Container elements are never parsed through host-stack recursion: the
//! parser keeps a work stack of pending frames (array accumulator, or map
//! accumulator with an optional pending key) and feeds each finished value
//! into the top frame. The stack cap is the decoder's depth bound.

use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::DecodeError;
use crate::intern::{intern_key, MAX_KEY_LEN};
use crate::marker::Marker;
use crate::opt::Opt;
use crate::value::{Map, Value};
use crate::{ExtHookFn, MAX_DEPTH};

pub(crate) fn decode(
    buf: &[u8],
    ext_hook: Option<&ExtHookFn>,
    opts: Opt,
) -> Result<Value, DecodeError> {
    let mut parser = Parser {
        data: buf,
        opts,
        ext_hook,
    };
    let value = parser.parse()?;
    if !parser.data.is_empty() {
        return Err(DecodeError::Malformed("trailing bytes after the value"));
    }
    Ok(value)
}

/// One pending container on the work stack.
enum Frame {
    Array {
        items: Vec<Value>,
        remaining: usize,
    },
    Map {
        entries: Vec<(Value, Value)>,
        pending_key: Option<Value>,
        remaining: usize,
    },
}

struct Parser<'a, 'h> {
    data: &'a [u8],
    opts: Opt,
    ext_hook: Option<&'h ExtHookFn>,
}

impl<'a, 'h> Parser<'a, 'h> {
    fn parse(&mut self) -> Result<Value, DecodeError> {
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            // A string parsed in key position goes through the intern
            // table; everywhere else takes the plain path.
            let at_key = matches!(
                stack.last(),
                Some(Frame::Map {
                    pending_key: None,
                    ..
                })
            );
            let mut value = match self.parse_one(at_key)? {
                Parsed::Value(value) => value,
                Parsed::OpenArray(len) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(DecodeError::DepthExceeded);
                    }
                    stack.push(Frame::Array {
                        items: Vec::with_capacity(len),
                        remaining: len,
                    });
                    continue;
                }
                Parsed::OpenMap(len) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(DecodeError::DepthExceeded);
                    }
                    stack.push(Frame::Map {
                        entries: Vec::with_capacity(len),
                        pending_key: None,
                        remaining: len,
                    });
                    continue;
                }
            };

            // Feed the finished value upward, popping every frame it
            // completes.
            loop {
                match stack.last_mut() {
                    None => return Ok(value),
                    Some(Frame::Array { items, remaining }) => {
                        items.push(value);
                        *remaining -= 1;
                        if *remaining > 0 {
                            break;
                        }
                        let Some(Frame::Array { items, .. }) = stack.pop() else {
                            unreachable!()
                        };
                        value = Value::Array(items);
                    }
                    Some(Frame::Map {
                        entries,
                        pending_key,
                        remaining,
                    }) => match pending_key.take() {
                        None => {
                            if !self.opts.contains(Opt::NON_STR_KEYS) && !value.is_str() {
                                return Err(DecodeError::NonStrKey);
                            }
                            *pending_key = Some(value);
                            break;
                        }
                        Some(key) => {
                            entries.push((key, value));
                            *remaining -= 1;
                            if *remaining > 0 {
                                break;
                            }
                            let Some(Frame::Map { entries, .. }) = stack.pop() else {
                                unreachable!()
                            };
                            value = Value::Map(Map::from(entries));
                        }
                    },
                }
            }
        }
    }

    /// Parse one terminal value, or announce a container that still needs
    /// elements.
    fn parse_one(&mut self, at_key: bool) -> Result<Parsed, DecodeError> {
        let marker = Marker::from_u8(self.read_u8("format byte")?);
        let value = match marker {
            Marker::Reserved => {
                return Err(DecodeError::Malformed("reserved format byte 0xc1"));
            }
            Marker::Null => Value::Null,
            Marker::False => Value::Bool(false),
            Marker::True => Value::Bool(true),
            Marker::PosFixInt(v) => Value::Int(v.into()),
            Marker::NegFixInt(v) => Value::Int(v.into()),
            Marker::UInt8 => Value::Int(self.read_u8("decode UInt8")?.into()),
            Marker::UInt16 => Value::Int(self.read_u16("decode UInt16")?.into()),
            Marker::UInt32 => Value::Int(self.read_u32("decode UInt32")?.into()),
            Marker::UInt64 => Value::Int(self.read_u64("decode UInt64")?.into()),
            Marker::Int8 => Value::Int(self.read_i8("decode Int8")?.into()),
            Marker::Int16 => Value::Int(
                self.data
                    .read_i16::<BigEndian>()
                    .map_err(|_| self.truncated("decode Int16", 2))?
                    .into(),
            ),
            Marker::Int32 => Value::Int(
                self.data
                    .read_i32::<BigEndian>()
                    .map_err(|_| self.truncated("decode Int32", 4))?
                    .into(),
            ),
            Marker::Int64 => Value::Int(
                self.data
                    .read_i64::<BigEndian>()
                    .map_err(|_| self.truncated("decode Int64", 8))?
                    .into(),
            ),
            Marker::F32 => Value::F32(
                self.data
                    .read_f32::<BigEndian>()
                    .map_err(|_| self.truncated("decode F32", 4))?,
            ),
            Marker::F64 => Value::F64(
                self.data
                    .read_f64::<BigEndian>()
                    .map_err(|_| self.truncated("decode F64", 8))?,
            ),
            Marker::FixStr(len) => self.parse_str(len as usize, at_key)?,
            Marker::Str8 => {
                let len = self.read_u8("decode Str8 length")? as usize;
                self.parse_str(len, at_key)?
            }
            Marker::Str16 => {
                let len = self.read_u16("decode Str16 length")? as usize;
                self.parse_str(len, at_key)?
            }
            Marker::Str32 => {
                let len = self.read_u32("decode Str32 length")? as usize;
                self.parse_str(len, at_key)?
            }
            Marker::Bin8 => {
                let len = self.read_u8("decode Bin8 length")? as usize;
                Value::Bin(self.take_bytes(len, "get Bin8 content")?.to_vec())
            }
            Marker::Bin16 => {
                let len = self.read_u16("decode Bin16 length")? as usize;
                Value::Bin(self.take_bytes(len, "get Bin16 content")?.to_vec())
            }
            Marker::Bin32 => {
                let len = self.read_u32("decode Bin32 length")? as usize;
                Value::Bin(self.take_bytes(len, "get Bin32 content")?.to_vec())
            }
            Marker::FixArray(len) => return self.open_array(len as usize),
            Marker::Array16 => {
                let len = self.read_u16("decode Array16 length")? as usize;
                return self.open_array(len);
            }
            Marker::Array32 => {
                let len = self.read_u32("decode Array32 length")? as usize;
                return self.open_array(len);
            }
            Marker::FixMap(len) => return self.open_map(len as usize),
            Marker::Map16 => {
                let len = self.read_u16("decode Map16 length")? as usize;
                return self.open_map(len);
            }
            Marker::Map32 => {
                let len = self.read_u32("decode Map32 length")? as usize;
                return self.open_map(len);
            }
            Marker::FixExt1 => self.parse_ext(1)?,
            Marker::FixExt2 => self.parse_ext(2)?,
            Marker::FixExt4 => self.parse_ext(4)?,
            Marker::FixExt8 => self.parse_ext(8)?,
            Marker::FixExt16 => self.parse_ext(16)?,
            Marker::Ext8 => {
                let len = self.read_u8("decode Ext8 length")? as usize;
                self.parse_ext(len)?
            }
            Marker::Ext16 => {
                let len = self.read_u16("decode Ext16 length")? as usize;
                self.parse_ext(len)?
            }
            Marker::Ext32 => {
                let len = self.read_u32("decode Ext32 length")? as usize;
                self.parse_ext(len)?
            }
        };
        Ok(Parsed::Value(value))
    }

    fn open_array(&mut self, len: usize) -> Result<Parsed, DecodeError> {
        if len == 0 {
            return Ok(Parsed::Value(Value::Array(Vec::new())));
        }
        // Every element needs at least one byte, so an announced length
        // past the remaining input can never complete.
        if len > self.data.len() {
            return Err(self.truncated("get Array content", len));
        }
        Ok(Parsed::OpenArray(len))
    }

    fn open_map(&mut self, len: usize) -> Result<Parsed, DecodeError> {
        if len == 0 {
            return Ok(Parsed::Value(Value::Map(Map::new())));
        }
        if len.checked_mul(2).map_or(true, |n| n > self.data.len()) {
            return Err(self.truncated("get Map content", len));
        }
        Ok(Parsed::OpenMap(len))
    }

    fn parse_str(&mut self, len: usize, at_key: bool) -> Result<Value, DecodeError> {
        let bytes = self.take_bytes(len, "get Str content")?;
        let string = if at_key && len <= MAX_KEY_LEN {
            intern_key(bytes).map_err(|_| DecodeError::InvalidUtf8)?
        } else {
            Arc::from(
                std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?,
            )
        };
        Ok(Value::Str(string))
    }

    fn parse_ext(&mut self, len: usize) -> Result<Value, DecodeError> {
        let tag = self.read_i8("decode Ext type")?;
        let payload = self.take_bytes(len, "get Ext content")?;
        let Some(hook) = self.ext_hook else {
            return Err(DecodeError::UnsupportedExt(tag));
        };
        hook(tag, payload).map_err(DecodeError::ExtHookFailed)
    }

    fn truncated(&self, step: &'static str, expected: usize) -> DecodeError {
        DecodeError::Truncated {
            step,
            expected,
            actual: self.data.len(),
        }
    }

    fn take_bytes(&mut self, len: usize, step: &'static str) -> Result<&'a [u8], DecodeError> {
        if len > self.data.len() {
            return Err(self.truncated(step, len));
        }
        let (bytes, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(bytes)
    }

    fn read_u8(&mut self, step: &'static str) -> Result<u8, DecodeError> {
        self.data.read_u8().map_err(|_| self.truncated(step, 1))
    }

    fn read_i8(&mut self, step: &'static str) -> Result<i8, DecodeError> {
        self.data.read_i8().map_err(|_| self.truncated(step, 1))
    }

    fn read_u16(&mut self, step: &'static str) -> Result<u16, DecodeError> {
        self.data
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated(step, 2))
    }

    fn read_u32(&mut self, step: &'static str) -> Result<u32, DecodeError> {
        self.data
            .read_u32::<BigEndian>()
            .map_err(|_| self.truncated(step, 4))
    }

    fn read_u64(&mut self, step: &'static str) -> Result<u64, DecodeError> {
        self.data
            .read_u64::<BigEndian>()
            .map_err(|_| self.truncated(step, 8))
    }
}

enum Parsed {
    Value(Value),
    OpenArray(usize),
    OpenMap(usize),
}
