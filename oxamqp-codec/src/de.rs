//! Deserializer
//!
//! Every count read from the wire is checked against the bytes that are
//! actually left before anything is allocated or iterated, and described
//! types, lists, maps and arrays may only nest [`MAX_NESTING_DEPTH`] deep.

use std::convert::TryFrom;

use serde::de::{self, Deserializer as _, IgnoredAny, SeqAccess};

use crate::{
    __constants::{DESCRIBED_BASIC, DESCRIBED_LIST, DESCRIPTOR, VALUE},
    descriptor::Descriptor,
    error::Error,
    format_code::EncodingCodes,
    read::SliceReader,
    util::{EnumType, NewType},
};

/// Maximum number of described types, lists, maps and arrays that may be
/// nested inside each other
pub const MAX_NESTING_DEPTH: usize = 64;

/// Deserialize an instance of type `T` from a slice of bytes.
///
/// Trailing bytes after the first value are an error.
pub fn from_slice<'de, T>(slice: &'de [u8]) -> Result<T, Error>
where
    T: de::Deserialize<'de>,
{
    let mut de = Deserializer::new(slice);
    let value = T::deserialize(&mut de)?;
    if !de.remaining().is_empty() {
        return Err(Error::InvalidLength);
    }
    Ok(value)
}

fn unexpected(found: EncodingCodes, expecting: &str) -> Error {
    Error::invalid_value(format!("expecting {}, found {}", expecting, found))
}

/// Constructor shared by all elements of an array
#[derive(Debug, Clone, Copy)]
struct ElemConstructor<'de> {
    /// Encoded descriptor when the elements are described
    descriptor: Option<&'de [u8]>,
    code: EncodingCodes,
}

/// A structure that deserializes AMQP1.0 wire format into Rust types
#[derive(Debug)]
pub struct Deserializer<'de> {
    reader: SliceReader<'de>,
    new_type: NewType,
    enum_type: EnumType,

    /// Set while the elements of an array are read
    elem: Option<ElemConstructor<'de>>,
    depth: usize,
}

impl<'de> Deserializer<'de> {
    /// Creates a new deserializer over a slice
    pub fn new(slice: &'de [u8]) -> Self {
        Self {
            reader: SliceReader::new(slice),
            new_type: NewType::None,
            enum_type: EnumType::None,
            elem: None,
            depth: 0,
        }
    }

    /// Number of bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.reader.consumed()
    }

    /// Bytes that have not been decoded yet
    pub fn remaining(&self) -> &'de [u8] {
        self.reader.remaining()
    }

    fn enter(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Format code of the next value. Inside an array this is the shared
    /// element constructor, which is never consumed.
    fn peek_code(&self) -> Result<EncodingCodes, Error> {
        match self.elem {
            Some(ElemConstructor {
                descriptor: Some(_),
                ..
            }) => Ok(EncodingCodes::DescribedType),
            Some(elem) => Ok(elem.code),
            None => {
                let byte = self.reader.peek().ok_or(Error::UnexpectedEof)?;
                EncodingCodes::try_from(byte)
            }
        }
    }

    fn read_code(&mut self) -> Result<EncodingCodes, Error> {
        match self.elem {
            Some(_) => self.peek_code(),
            None => EncodingCodes::try_from(self.reader.next()?),
        }
    }

    fn read_variable(&mut self, code: EncodingCodes) -> Result<&'de [u8], Error> {
        let wide = matches!(
            code,
            EncodingCodes::VBin32 | EncodingCodes::Str32 | EncodingCodes::Sym32
        );
        let len = self.reader.read_len(wide)?;
        if len > self.reader.remaining().len() {
            return Err(Error::InvalidLength);
        }
        self.reader.get_byte_slice(len)
    }

    /// Reads the size and count of a list, map or array and returns the
    /// count together with the position where the content ends.
    ///
    /// Every item takes at least one byte of content, so a count larger
    /// than the content is rejected before any item is visited.
    fn read_compound(&mut self, code: EncodingCodes) -> Result<(usize, usize), Error> {
        let wide = match code {
            EncodingCodes::List0 => return Ok((0, self.reader.consumed())),
            EncodingCodes::List8 | EncodingCodes::Map8 | EncodingCodes::Array8 => false,
            EncodingCodes::List32 | EncodingCodes::Map32 | EncodingCodes::Array32 => true,
            other => return Err(unexpected(other, "list, map or array")),
        };
        let width = if wide { 4 } else { 1 };
        let size = self.reader.read_len(wide)?;
        if size < width || size > self.reader.remaining().len() {
            return Err(Error::InvalidLength);
        }
        let end = self.reader.consumed() + size;
        let count = self.reader.read_len(wide)?;
        if count > size - width {
            return Err(Error::InvalidLength);
        }
        Ok((count, end))
    }

    fn read_elem_constructor(&mut self) -> Result<ElemConstructor<'de>, Error> {
        let code = EncodingCodes::try_from(self.reader.next()?)?;
        if code != EncodingCodes::DescribedType {
            return Ok(ElemConstructor {
                descriptor: None,
                code,
            });
        }

        let start = self.reader.remaining();
        let before = self.reader.consumed();
        let saved = self.elem.take();
        let skipped = self.skip_value();
        self.elem = saved;
        skipped?;
        let descriptor = &start[..self.reader.consumed() - before];

        match EncodingCodes::try_from(self.reader.next()?)? {
            EncodingCodes::DescribedType => Err(Error::invalid_value(
                "array element constructor is described twice",
            )),
            code => Ok(ElemConstructor {
                descriptor: Some(descriptor),
                code,
            }),
        }
    }

    /// Skips the next value without building it
    fn skip_value(&mut self) -> Result<(), Error> {
        let code = match self.elem {
            Some(elem) => elem.code,
            None => EncodingCodes::try_from(self.reader.next()?)?,
        };
        self.skip_body(code)
    }

    fn skip_body(&mut self, code: EncodingCodes) -> Result<(), Error> {
        use EncodingCodes as C;
        match code {
            C::DescribedType => {
                self.enter()?;
                let skipped = self.skip_value().and_then(|_| self.skip_value());
                self.leave();
                skipped
            }
            C::VBin8 | C::VBin32 | C::Str8 | C::Str32 | C::Sym8 | C::Sym32 => {
                self.read_variable(code).map(|_| ())
            }
            C::List0 => Ok(()),
            C::List8 | C::List32 | C::Map8 | C::Map32 | C::Array8 | C::Array32 => {
                let (_, end) = self.read_compound(code)?;
                let rest = end - self.reader.consumed();
                self.reader.get_byte_slice(rest).map(|_| ())
            }
            fixed => {
                let width = fixed.fixed_width().unwrap_or(0);
                self.reader.get_byte_slice(width).map(|_| ())
            }
        }
    }

    /// Visits the items of a list, map or array whose header has been read.
    ///
    /// Items the visitor leaves behind are skipped and the content must be
    /// consumed exactly.
    fn visit_items<T, F>(
        &mut self,
        count: usize,
        end: usize,
        elem: Option<ElemConstructor<'de>>,
        f: F,
    ) -> Result<T, Error>
    where
        F: FnOnce(&mut CompoundAccess<'_, 'de>) -> Result<T, Error>,
    {
        self.enter()?;
        let saved = std::mem::replace(&mut self.elem, elem);

        let mut access = CompoundAccess {
            de: &mut *self,
            remaining: count,
        };
        let visited = f(&mut access);
        let leftover = access.remaining;
        let result = visited.and_then(|value| {
            for _ in 0..leftover {
                self.skip_value()?;
            }
            Ok(value)
        });

        self.elem = saved;
        self.leave();
        let value = result?;
        if self.reader.consumed() != end {
            return Err(Error::InvalidLength);
        }
        Ok(value)
    }

    fn parse_bool(&mut self) -> Result<bool, Error> {
        match self.read_code()? {
            EncodingCodes::BooleanTrue => Ok(true),
            EncodingCodes::BooleanFalse => Ok(false),
            EncodingCodes::Boolean => match self.reader.next()? {
                0x00 => Ok(false),
                0x01 => Ok(true),
                other => Err(Error::invalid_value(format!(
                    "invalid boolean byte 0x{:02x}",
                    other
                ))),
            },
            code => Err(unexpected(code, "boolean")),
        }
    }

    fn parse_u32(&mut self) -> Result<u32, Error> {
        match self.read_code()? {
            EncodingCodes::UInt => Ok(u32::from_be_bytes(self.reader.read_const_bytes()?)),
            EncodingCodes::SmallUInt => Ok(self.reader.next()? as u32),
            EncodingCodes::UInt0 => Ok(0),
            code => Err(unexpected(code, "uint")),
        }
    }

    fn parse_u64(&mut self) -> Result<u64, Error> {
        match self.read_code()? {
            EncodingCodes::ULong => Ok(u64::from_be_bytes(self.reader.read_const_bytes()?)),
            EncodingCodes::SmallULong => Ok(self.reader.next()? as u64),
            EncodingCodes::ULong0 => Ok(0),
            code => Err(unexpected(code, "ulong")),
        }
    }

    fn parse_i32(&mut self) -> Result<i32, Error> {
        match self.read_code()? {
            EncodingCodes::Int => Ok(i32::from_be_bytes(self.reader.read_const_bytes()?)),
            EncodingCodes::SmallInt => Ok(self.reader.next()? as i8 as i32),
            code => Err(unexpected(code, "int")),
        }
    }

    fn parse_i64(&mut self) -> Result<i64, Error> {
        let timestamp = std::mem::take(&mut self.new_type) == NewType::Timestamp;
        match self.read_code()? {
            EncodingCodes::Timestamp if timestamp => {
                Ok(i64::from_be_bytes(self.reader.read_const_bytes()?))
            }
            EncodingCodes::Long if !timestamp => {
                Ok(i64::from_be_bytes(self.reader.read_const_bytes()?))
            }
            EncodingCodes::SmallLong if !timestamp => Ok(self.reader.next()? as i8 as i64),
            code if timestamp => Err(unexpected(code, "timestamp")),
            code => Err(unexpected(code, "long")),
        }
    }

    fn parse_fixed<const N: usize>(
        &mut self,
        expected: EncodingCodes,
    ) -> Result<[u8; N], Error> {
        match self.read_code()? {
            code if code == expected => self.reader.read_const_bytes(),
            code => Err(unexpected(code, &expected.to_string())),
        }
    }

    fn parse_str(&mut self) -> Result<&'de str, Error> {
        let symbol = std::mem::take(&mut self.new_type) == NewType::Symbol;
        let bytes = match self.read_code()? {
            code @ (EncodingCodes::Sym8 | EncodingCodes::Sym32) if symbol => {
                self.read_variable(code)?
            }
            code @ (EncodingCodes::Str8 | EncodingCodes::Str32) if !symbol => {
                self.read_variable(code)?
            }
            code if symbol => return Err(unexpected(code, "symbol")),
            code => return Err(unexpected(code, "string")),
        };
        std::str::from_utf8(bytes).map_err(Into::into)
    }

    fn parse_bytes(&mut self) -> Result<&'de [u8], Error> {
        let fixed = match std::mem::take(&mut self.new_type) {
            NewType::Uuid => Some(EncodingCodes::Uuid),
            NewType::Dec32 => Some(EncodingCodes::Decimal32),
            NewType::Dec64 => Some(EncodingCodes::Decimal64),
            NewType::Dec128 => Some(EncodingCodes::Decimal128),
            _ => None,
        };
        match (self.read_code()?, fixed) {
            (code, Some(expected)) if code == expected => {
                let width = code.fixed_width().unwrap_or(0);
                self.reader.get_byte_slice(width)
            }
            (code, Some(expected)) => Err(unexpected(code, &expected.to_string())),
            (code @ (EncodingCodes::VBin8 | EncodingCodes::VBin32), None) => {
                self.read_variable(code)
            }
            (code, None) => Err(unexpected(code, "binary")),
        }
    }

    /// Descriptor of the described value that comes next, without consuming
    /// anything
    fn peek_descriptor(&self) -> Result<Descriptor, Error> {
        let encoded = match self.elem {
            Some(ElemConstructor {
                descriptor: Some(descriptor),
                ..
            }) => descriptor,
            _ => self.reader.remaining().get(1..).ok_or(Error::UnexpectedEof)?,
        };
        let mut de = Deserializer::new(encoded);
        de.depth = self.depth;
        de::Deserialize::deserialize(&mut de)
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        use EncodingCodes as C;
        match self.peek_code()? {
            C::DescribedType => self.deserialize_struct(DESCRIBED_BASIC, &[], visitor),
            C::Null => self.deserialize_unit(visitor),
            C::Boolean | C::BooleanTrue | C::BooleanFalse => self.deserialize_bool(visitor),
            C::UByte => self.deserialize_u8(visitor),
            C::UShort => self.deserialize_u16(visitor),
            C::UInt | C::SmallUInt | C::UInt0 => self.deserialize_u32(visitor),
            C::ULong | C::SmallULong | C::ULong0 => self.deserialize_u64(visitor),
            C::Byte => self.deserialize_i8(visitor),
            C::Short => self.deserialize_i16(visitor),
            C::Int | C::SmallInt => self.deserialize_i32(visitor),
            C::Long | C::SmallLong => self.deserialize_i64(visitor),
            C::Timestamp => {
                self.new_type = NewType::Timestamp;
                self.deserialize_i64(visitor)
            }
            C::Float => self.deserialize_f32(visitor),
            C::Double => self.deserialize_f64(visitor),
            C::Char => self.deserialize_char(visitor),
            C::Uuid => {
                self.new_type = NewType::Uuid;
                self.deserialize_bytes(visitor)
            }
            C::Decimal32 => {
                self.new_type = NewType::Dec32;
                self.deserialize_bytes(visitor)
            }
            C::Decimal64 => {
                self.new_type = NewType::Dec64;
                self.deserialize_bytes(visitor)
            }
            C::Decimal128 => {
                self.new_type = NewType::Dec128;
                self.deserialize_bytes(visitor)
            }
            C::VBin8 | C::VBin32 => self.deserialize_bytes(visitor),
            C::Str8 | C::Str32 => self.deserialize_str(visitor),
            C::Sym8 | C::Sym32 => {
                self.new_type = NewType::Symbol;
                self.deserialize_str(visitor)
            }
            C::List0 | C::List8 | C::List32 | C::Array8 | C::Array32 => {
                self.deserialize_seq(visitor)
            }
            C::Map8 | C::Map32 => self.deserialize_map(visitor),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_bool(self.parse_bool()?)
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let [byte] = self.parse_fixed::<1>(EncodingCodes::Byte)?;
        visitor.visit_i8(byte as i8)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_i16(i16::from_be_bytes(self.parse_fixed(EncodingCodes::Short)?))
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_i32(self.parse_i32()?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_i64(self.parse_i64()?)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let [byte] = self.parse_fixed::<1>(EncodingCodes::UByte)?;
        visitor.visit_u8(byte)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_u16(u16::from_be_bytes(self.parse_fixed(EncodingCodes::UShort)?))
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_u32(self.parse_u32()?)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_u64(self.parse_u64()?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_f32(f32::from_be_bytes(self.parse_fixed(EncodingCodes::Float)?))
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_f64(f64::from_be_bytes(self.parse_fixed(EncodingCodes::Double)?))
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let code_point = u32::from_be_bytes(self.parse_fixed(EncodingCodes::Char)?);
        let c = char::from_u32(code_point)
            .ok_or_else(|| Error::invalid_value(format!("invalid char 0x{:x}", code_point)))?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.parse_str()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_bytes(self.parse_bytes()?)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.peek_code()? {
            EncodingCodes::Null => {
                self.read_code()?;
                visitor.visit_none()
            }
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.read_code()? {
            EncodingCodes::Null => visitor.visit_unit(),
            code => Err(unexpected(code, "null")),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.new_type = NewType::from_name(name);
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        use EncodingCodes as C;
        let new_type = std::mem::take(&mut self.new_type);
        match self.peek_code()? {
            code @ (C::List0 | C::List8 | C::List32) => {
                self.read_code()?;
                let (count, end) = self.read_compound(code)?;
                self.visit_items(count, end, None, |access| visitor.visit_seq(access))
            }
            code @ (C::Array8 | C::Array32) => {
                self.read_code()?;
                let (count, end) = self.read_compound(code)?;
                let elem = self.read_elem_constructor()?;
                self.visit_items(count, end, Some(elem), |access| visitor.visit_seq(access))
            }
            // A single value where an array is expected counts as an array
            // of one element
            _ if new_type == NewType::Array => visitor.visit_seq(SingleElement {
                de: self,
                done: false,
            }),
            code => Err(unexpected(code, "list or array")),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let code = self.read_code()?;
        if !matches!(code, EncodingCodes::Map8 | EncodingCodes::Map32) {
            return Err(unexpected(code, "map"));
        }
        let (count, end) = self.read_compound(code)?;
        if count % 2 != 0 {
            return Err(Error::InvalidLength);
        }
        self.visit_items(count, end, None, |access| visitor.visit_map(access))
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let list = match name {
            DESCRIBED_LIST => true,
            DESCRIBED_BASIC => false,
            _ => return self.deserialize_tuple(fields.len(), visitor),
        };

        let code = self.read_code()?;
        if code != EncodingCodes::DescribedType {
            return Err(unexpected(code, "described type"));
        }
        self.enter()?;
        let saved = self.elem;

        let mut access = DescribedAccess {
            de: &mut *self,
            field: DescribedField::Descriptor,
            list,
            shared: saved,
            end: None,
        };
        let result = visitor.visit_seq(&mut access).and_then(|value| {
            while access.next_element::<IgnoredAny>()?.is_some() {}
            Ok(value)
        });
        let end = access.end;

        self.elem = saved;
        self.leave();
        let value = result?;
        match end {
            Some(end) if end != self.reader.consumed() => Err(Error::InvalidLength),
            _ => Ok(value),
        }
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match name {
            VALUE => {
                self.enum_type = EnumType::Value;
                visitor.visit_enum(self)
            }
            DESCRIPTOR => {
                self.enum_type = EnumType::Descriptor;
                visitor.visit_enum(self)
            }
            _ => match self.peek_code()? {
                // Variants with a payload are a single entry map from the
                // variant index to the payload
                code @ (EncodingCodes::Map8 | EncodingCodes::Map32) => {
                    self.read_code()?;
                    let (count, end) = self.read_compound(code)?;
                    if count != 2 {
                        return Err(Error::InvalidLength);
                    }
                    self.visit_items(count, end, None, |access| visitor.visit_enum(access))
                }
                _ => visitor.visit_enum(self),
            },
        }
    }

    // Value and Descriptor identify their variant by the format code and
    // other enums of described types by the descriptor, neither of which is
    // consumed here
    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        use EncodingCodes as C;
        match std::mem::take(&mut self.enum_type) {
            EnumType::Value | EnumType::Descriptor => visitor.visit_u8(self.peek_code()? as u8),
            EnumType::None => match self.peek_code()? {
                C::DescribedType => match self.peek_descriptor()? {
                    Descriptor::Name(name) => visitor.visit_str(name.as_str()),
                    Descriptor::Code(code) => visitor.visit_u64(code),
                },
                C::Str8 | C::Str32 => self.deserialize_str(visitor),
                C::Sym8 | C::Sym32 => {
                    self.new_type = NewType::Symbol;
                    self.deserialize_str(visitor)
                }
                C::ULong | C::SmallULong | C::ULong0 => self.deserialize_u64(visitor),
                _ => self.deserialize_u32(visitor),
            },
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.skip_value()?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl<'de, 'a> de::EnumAccess<'de> for &'a mut Deserializer<'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(&mut *self)?;
        Ok((variant, self))
    }
}

impl<'de, 'a> de::VariantAccess<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }
}

/// Items of a list, map or array, or the single entry of an enum map
#[derive(Debug)]
struct CompoundAccess<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de: 'a> CompoundAccess<'a, 'de> {
    fn next_item<T>(&mut self, seed: T) -> Result<Option<T::Value>, Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.remaining {
            0 => Ok(None),
            _ => {
                self.remaining -= 1;
                seed.deserialize(&mut *self.de).map(Some)
            }
        }
    }
}

impl<'a, 'de: 'a> de::SeqAccess<'de> for CompoundAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        self.next_item(seed)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

impl<'a, 'de: 'a> de::MapAccess<'de> for CompoundAccess<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        self.next_item(seed)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        self.next_item(seed)?.ok_or(Error::InvalidLength)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining / 2)
    }
}

impl<'a, 'b, 'de: 'a> de::EnumAccess<'de> for &'b mut CompoundAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = self.next_item(seed)?.ok_or(Error::InvalidLength)?;
        Ok((variant, self))
    }
}

impl<'a, 'b, 'de: 'a> de::VariantAccess<'de> for &'b mut CompoundAccess<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        self.next_item(std::marker::PhantomData::<()>)?
            .ok_or(Error::InvalidLength)
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        self.next_item(seed)?.ok_or(Error::InvalidLength)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.remaining = self.remaining.checked_sub(1).ok_or(Error::InvalidLength)?;
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.tuple_variant(fields.len(), visitor)
    }
}

/// A lone value standing in for an array
struct SingleElement<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    done: bool,
}

impl<'a, 'de: 'a> de::SeqAccess<'de> for SingleElement<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(usize::from(!self.done))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescribedField {
    Descriptor,
    Value,
    Items(usize),
    Done,
}

/// Yields the descriptor of a described type followed by either its value
/// or, for described lists, the items of the list
struct DescribedAccess<'a, 'de: 'a> {
    de: &'a mut Deserializer<'de>,
    field: DescribedField,
    list: bool,

    /// Constructor of the enclosing array, if any
    shared: Option<ElemConstructor<'de>>,

    /// Position where the described list ends
    end: Option<usize>,
}

impl<'a, 'de: 'a> DescribedAccess<'a, 'de> {
    fn read_descriptor<T>(&mut self, seed: T) -> Result<T::Value, Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.shared {
            Some(ElemConstructor {
                descriptor: Some(encoded),
                code,
            }) => {
                let mut de = Deserializer::new(encoded);
                de.depth = self.de.depth;
                let descriptor = seed.deserialize(&mut de)?;
                // The value of an array element only has its body left
                self.de.elem = Some(ElemConstructor {
                    descriptor: None,
                    code,
                });
                Ok(descriptor)
            }
            _ => {
                self.de.elem = None;
                seed.deserialize(&mut *self.de)
            }
        }
    }
}

impl<'a, 'de: 'a> de::SeqAccess<'de> for DescribedAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.field {
            DescribedField::Descriptor => {
                let descriptor = self.read_descriptor(seed)?;
                self.field = if self.list {
                    let code = self.de.read_code()?;
                    if !matches!(
                        code,
                        EncodingCodes::List0 | EncodingCodes::List8 | EncodingCodes::List32
                    ) {
                        return Err(unexpected(code, "list"));
                    }
                    let (count, end) = self.de.read_compound(code)?;
                    self.de.elem = None;
                    self.end = Some(end);
                    DescribedField::Items(count)
                } else {
                    DescribedField::Value
                };
                Ok(Some(descriptor))
            }
            DescribedField::Value => {
                self.field = DescribedField::Done;
                seed.deserialize(&mut *self.de).map(Some)
            }
            DescribedField::Items(0) | DescribedField::Done => {
                self.field = DescribedField::Done;
                Ok(None)
            }
            DescribedField::Items(n) => {
                self.field = DescribedField::Items(n - 1);
                seed.deserialize(&mut *self.de).map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use crate::{
        described::Described,
        primitives::{Array, OrderedMap, Symbol},
        ser::to_vec,
        Error, Value,
    };

    use super::{from_slice, Deserializer, MAX_NESTING_DEPTH};

    #[test]
    fn test_deserialize_compact_integers() {
        assert_eq!(from_slice::<Value>(&[0x43]).unwrap(), Value::UInt(0));
        assert_eq!(from_slice::<Value>(&[0x52, 9]).unwrap(), Value::UInt(9));
        assert_eq!(from_slice::<Value>(&[0x54, 0xff]).unwrap(), Value::Int(-1));
        assert_eq!(from_slice::<u32>(&[0x70, 0, 0, 1, 0]).unwrap(), 256);
        assert_eq!(from_slice::<u64>(&[0x53, 7]).unwrap(), 7);
    }

    #[test]
    fn test_deserialize_list32_from_peer() {
        // Some peers always use the wide encodings
        let buf = [0xd0, 0, 0, 0, 6, 0, 0, 0, 2, 0x41, 0x40];
        assert_eq!(
            from_slice::<Value>(&buf).unwrap(),
            Value::List(vec![Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn test_deserialize_symbolic_descriptor() {
        let mut buf = vec![0x00, 0xa3, 15];
        buf.extend_from_slice(b"amqp:close:list");
        buf.push(0x45);
        let expected = Value::from(Described::new(
            Symbol::from("amqp:close:list"),
            Value::List(vec![]),
        ));
        assert_eq!(from_slice::<Value>(&buf).unwrap(), expected);
    }

    #[test]
    fn test_deserialize_array_of_symbols() {
        let array = Array::from(vec![Symbol::from("a"), Symbol::from("bc")]);
        let buf = to_vec(&array).unwrap();
        assert_eq!(buf[3], 0xb3);
        let typed: Array<Symbol> = from_slice(&buf).unwrap();
        assert_eq!(typed, array);
        let value: Value = from_slice(&buf).unwrap();
        assert_eq!(to_vec(&value).unwrap(), buf);
    }

    #[test]
    fn single_symbol_reads_as_array() {
        let buf = to_vec(&Symbol::from("x")).unwrap();
        let array: Array<Symbol> = from_slice(&buf).unwrap();
        assert_eq!(array.into_inner(), vec![Symbol::from("x")]);
    }

    #[test]
    fn test_deserialize_array_of_described() {
        let array = Array::from(vec![
            Described::new(0x24u64, 1i32),
            Described::new(0x24u64, -7i32),
        ]);
        let buf = to_vec(&array).unwrap();
        let decoded: Array<Described<i32>> = from_slice(&buf).unwrap();
        assert_eq!(decoded, array);
    }

    #[test]
    fn test_deserialize_message_body_map() {
        let mut map = OrderedMap::new();
        map.insert(Value::from("sequence"), Value::Int(42));
        map.insert(Value::from("large"), Value::Long(i64::MAX));
        let value = Value::Map(map);
        let buf = to_vec(&value).unwrap();
        assert_eq!(from_slice::<Value>(&buf).unwrap(), value);
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert!(matches!(
            from_slice::<Value>(&[0x70, 0, 0]),
            Err(Error::UnexpectedEof)
        ));
        assert!(matches!(from_slice::<Value>(&[]), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn length_beyond_input_is_an_error() {
        assert!(matches!(
            from_slice::<Value>(&[0xa1, 10, b'a']),
            Err(Error::InvalidLength)
        ));
        assert!(matches!(
            from_slice::<Value>(&[0xc0, 200, 1, 0x40]),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn count_beyond_content_is_rejected() {
        // An array claiming 50 million null elements in a single byte of content
        let buf = [0xf0, 0, 0, 0, 5, 0x02, 0xfa, 0xf0, 0x80, 0x40];
        assert!(matches!(
            from_slice::<Value>(&buf),
            Err(Error::InvalidLength)
        ));

        let list = [0xc0, 2, 200, 0x40];
        assert!(matches!(
            from_slice::<Value>(&list),
            Err(Error::InvalidLength)
        ));

        let odd_map = [0xc1, 2, 1, 0x40];
        assert!(matches!(
            from_slice::<Value>(&odd_map),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn deeply_nested_described_values_are_rejected() {
        let buf: Vec<u8> = [0x00, 0x53, 0x01]
            .iter()
            .copied()
            .cycle()
            .take(3 * 200_000)
            .collect();
        assert!(matches!(
            from_slice::<Value>(&buf),
            Err(Error::NestingTooDeep(MAX_NESTING_DEPTH))
        ));
        assert!(from_slice::<Value>(&vec![0x00; 200_000]).is_err());
    }

    fn nested_lists(levels: usize) -> Vec<u8> {
        let mut buf = vec![0x45];
        for _ in 0..levels {
            let size = (buf.len() + 4) as u32;
            let mut outer = vec![0xd0];
            outer.extend_from_slice(&size.to_be_bytes());
            outer.extend_from_slice(&1u32.to_be_bytes());
            outer.append(&mut buf);
            buf = outer;
        }
        buf
    }

    #[test]
    fn nesting_depth_is_limited() {
        // the innermost empty list counts as a level too
        assert!(from_slice::<Value>(&nested_lists(MAX_NESTING_DEPTH - 1)).is_ok());
        assert!(matches!(
            from_slice::<Value>(&nested_lists(MAX_NESTING_DEPTH)),
            Err(Error::NestingTooDeep(_))
        ));
        // skipping a value is bounded the same way
        let mut skipped = vec![0x00; 100_000];
        skipped.push(0x40);
        let mut de = Deserializer::new(&skipped);
        assert!(matches!(
            serde::de::IgnoredAny::deserialize(&mut de),
            Err(Error::NestingTooDeep(_))
        ));
    }

    #[test]
    fn unknown_format_code_is_an_error() {
        assert!(matches!(
            from_slice::<Value>(&[0x99]),
            Err(Error::InvalidFormatCode(0x99))
        ));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        assert!(matches!(
            from_slice::<Value>(&[0xa1, 2, 0xc3, 0x28]),
            Err(Error::InvalidUtf8Encoding)
        ));
    }

    #[test]
    fn mismatched_type_is_an_error() {
        assert!(matches!(
            from_slice::<u32>(&[0xa1, 1, b'a']),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            from_slice::<Symbol>(&[0xa1, 1, b'a']),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn deserializer_reports_consumed_bytes() {
        let buf = [0x52, 1, 0x40, 0x41];
        let mut de = Deserializer::new(&buf);
        assert_eq!(Value::deserialize(&mut de).unwrap(), Value::UInt(1));
        assert_eq!(de.consumed(), 2);
        assert_eq!(Value::deserialize(&mut de).unwrap(), Value::Null);
        assert_eq!(de.remaining(), &[0x41]);
    }

    #[test]
    fn trailing_bytes_are_an_error() {
        assert!(matches!(
            from_slice::<Value>(&[0x40, 0x40]),
            Err(Error::InvalidLength)
        ));
    }
}
