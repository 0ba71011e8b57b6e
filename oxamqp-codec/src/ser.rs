//! Serializer
//!
//! Values always take their most compact encoding (`uint0`, `smalluint`,
//! `list0`, 8-bit widths, ...) except for array elements, which share one
//! constructor and therefore use the wide form of their type.

use std::io::Write;

use serde::{ser, Serialize};

use crate::{
    __constants::{DESCRIBED_BASIC, DESCRIBED_LIST, DESCRIPTOR},
    error::Error,
    format_code::EncodingCodes,
    util::{IsArrayElement, NewType},
};

/// Size of the count field of an 8-bit compound, which its size field covers
const OFFSET_8: usize = 1;

/// Size of the count field of a 32-bit compound, which its size field covers
const OFFSET_32: usize = 4;

/// Serializes the value into a new `Vec<u8>`
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, Error>
where
    T: Serialize + ?Sized,
{
    let mut writer = Vec::new();
    let mut serializer = Serializer::new(&mut writer);
    value.serialize(&mut serializer)?;
    Ok(writer)
}

/// Serializes a value into a caller owned slice and returns the number of
/// bytes written.
///
/// If the slice is too small, [`Error::Overflow`] is returned and nothing
/// is written.
pub fn write_to_slice<T>(value: &T, slice: &mut [u8]) -> Result<usize, Error>
where
    T: Serialize + ?Sized,
{
    let buf = to_vec(value)?;
    let required = buf.len();
    if required > slice.len() {
        return Err(Error::Overflow {
            required,
            available: slice.len(),
        });
    }
    slice[..required].copy_from_slice(&buf);
    Ok(required)
}

/// A struct for serializing Rust structs/values into AMQP1.0 wire format
#[derive(Debug)]
pub struct Serializer<W> {
    /// The output
    pub writer: W,
    new_type: NewType,
    is_array_elem: IsArrayElement,

    /// Constructor written by the first element of an array
    elem_code: Option<EncodingCodes>,
}

impl<W: Write> From<W> for Serializer<W> {
    fn from(writer: W) -> Self {
        Self::new(writer)
    }
}

impl<W: Write> Serializer<W> {
    /// Creates a new AMQP1.0 serializer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            new_type: NewType::None,
            is_array_elem: IsArrayElement::False,
            elem_code: None,
        }
    }

    fn array_element(writer: W, is_array_elem: IsArrayElement) -> Self {
        Self {
            is_array_elem,
            ..Self::new(writer)
        }
    }

    /// Consumes the serializer and returns the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes the format code of a value. Only the first element of an array
    /// writes it, the other elements check that they would use the same one.
    fn write_constructor(&mut self, code: EncodingCodes) -> Result<(), Error> {
        match self.is_array_elem {
            IsArrayElement::False => self.writer.write_all(&[code as u8])?,
            IsArrayElement::FirstElement => {
                self.writer.write_all(&[code as u8])?;
                self.elem_code = Some(code);
            }
            IsArrayElement::OtherElement(first) if first == code => {}
            IsArrayElement::OtherElement(_) => return Err(Error::HeterogeneousArray),
        }
        Ok(())
    }

    fn write_variable(
        &mut self,
        bytes: &[u8],
        code8: EncodingCodes,
        code32: EncodingCodes,
    ) -> Result<(), Error> {
        match (self.is_array_elem, u8::try_from(bytes.len())) {
            (IsArrayElement::False, Ok(len)) => self.writer.write_all(&[code8 as u8, len])?,
            _ => {
                self.write_constructor(code32)?;
                let len = u32::try_from(bytes.len()).map_err(|_| Error::too_long())?;
                self.writer.write_all(&len.to_be_bytes())?;
            }
        }
        self.writer.write_all(bytes).map_err(Into::into)
    }

    fn write_fixed(&mut self, code: EncodingCodes, bytes: &[u8]) -> Result<(), Error> {
        self.write_constructor(code)?;
        self.writer.write_all(bytes).map_err(Into::into)
    }

    /// Writes a list, map or array header followed by the already encoded
    /// content. `code8` is `None` for arrays nested in arrays.
    fn write_compound(
        &mut self,
        code8: EncodingCodes,
        code32: EncodingCodes,
        count: usize,
        content: &[u8],
    ) -> Result<(), Error> {
        let size8 = u8::try_from(content.len() + OFFSET_8);
        match (self.is_array_elem, size8, u8::try_from(count)) {
            (IsArrayElement::False, Ok(size), Ok(count)) => {
                self.writer.write_all(&[code8 as u8, size, count])?;
            }
            _ => {
                self.write_constructor(code32)?;
                let size =
                    u32::try_from(content.len() + OFFSET_32).map_err(|_| Error::too_long())?;
                let count = u32::try_from(count).map_err(|_| Error::too_long())?;
                self.writer.write_all(&size.to_be_bytes())?;
                self.writer.write_all(&count.to_be_bytes())?;
            }
        }
        self.writer.write_all(content).map_err(Into::into)
    }

    fn write_list(&mut self, count: usize, content: &[u8]) -> Result<(), Error> {
        if count == 0 && self.is_array_elem == IsArrayElement::False {
            return self.write_constructor(EncodingCodes::List0);
        }
        self.write_compound(EncodingCodes::List8, EncodingCodes::List32, count, content)
    }

    fn write_map(&mut self, count: usize, content: &[u8]) -> Result<(), Error> {
        self.write_compound(EncodingCodes::Map8, EncodingCodes::Map32, count, content)
    }

    fn write_array(&mut self, count: usize, content: &[u8]) -> Result<(), Error> {
        self.write_compound(EncodingCodes::Array8, EncodingCodes::Array32, count, content)
    }

    /// Enums other than the descriptor are a map with a single entry from
    /// the variant index to the value
    fn write_variant(&mut self, variant_index: u32, value: &[u8]) -> Result<(), Error> {
        let mut entry = Vec::with_capacity(value.len() + 5);
        ser::Serializer::serialize_u32(&mut Serializer::new(&mut entry), variant_index)?;
        entry.extend_from_slice(value);
        self.write_map(2, &entry)
    }
}

impl<'a, W: Write + 'a> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = SeqSerializer<'a, W>;
    type SerializeTuple = SeqSerializer<'a, W>;
    type SerializeTupleStruct = SeqSerializer<'a, W>;
    type SerializeTupleVariant = VariantSerializer<'a, W>;
    type SerializeMap = MapSerializer<'a, W>;
    type SerializeStruct = StructSerializer<'a, W>;
    type SerializeStructVariant = VariantSerializer<'a, W>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        match (self.is_array_elem, v) {
            (IsArrayElement::False, true) => self.write_constructor(EncodingCodes::BooleanTrue),
            (IsArrayElement::False, false) => self.write_constructor(EncodingCodes::BooleanFalse),
            _ => self.write_fixed(EncodingCodes::Boolean, &[v as u8]),
        }
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::Byte, &v.to_be_bytes())
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::Short, &v.to_be_bytes())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        match (self.is_array_elem, i8::try_from(v)) {
            (IsArrayElement::False, Ok(small)) => {
                self.write_fixed(EncodingCodes::SmallInt, &small.to_be_bytes())
            }
            _ => self.write_fixed(EncodingCodes::Int, &v.to_be_bytes()),
        }
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        if std::mem::take(&mut self.new_type) == NewType::Timestamp {
            return self.write_fixed(EncodingCodes::Timestamp, &v.to_be_bytes());
        }
        match (self.is_array_elem, i8::try_from(v)) {
            (IsArrayElement::False, Ok(small)) => {
                self.write_fixed(EncodingCodes::SmallLong, &small.to_be_bytes())
            }
            _ => self.write_fixed(EncodingCodes::Long, &v.to_be_bytes()),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::UByte, &[v])
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::UShort, &v.to_be_bytes())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        match (self.is_array_elem, v) {
            (IsArrayElement::False, 0) => self.write_constructor(EncodingCodes::UInt0),
            (IsArrayElement::False, 1..=255) => {
                self.write_fixed(EncodingCodes::SmallUInt, &[v as u8])
            }
            _ => self.write_fixed(EncodingCodes::UInt, &v.to_be_bytes()),
        }
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        match (self.is_array_elem, v) {
            (IsArrayElement::False, 0) => self.write_constructor(EncodingCodes::ULong0),
            (IsArrayElement::False, 1..=255) => {
                self.write_fixed(EncodingCodes::SmallULong, &[v as u8])
            }
            _ => self.write_fixed(EncodingCodes::ULong, &v.to_be_bytes()),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::Float, &v.to_be_bytes())
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::Double, &v.to_be_bytes())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.write_fixed(EncodingCodes::Char, &(v as u32).to_be_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        match std::mem::take(&mut self.new_type) {
            NewType::Symbol => {
                self.write_variable(v.as_bytes(), EncodingCodes::Sym8, EncodingCodes::Sym32)
            }
            _ => self.write_variable(v.as_bytes(), EncodingCodes::Str8, EncodingCodes::Str32),
        }
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        let fixed = match std::mem::take(&mut self.new_type) {
            NewType::Uuid => Some((EncodingCodes::Uuid, 16)),
            NewType::Dec32 => Some((EncodingCodes::Decimal32, 4)),
            NewType::Dec64 => Some((EncodingCodes::Decimal64, 8)),
            NewType::Dec128 => Some((EncodingCodes::Decimal128, 16)),
            _ => None,
        };
        match fixed {
            Some((code, width)) if v.len() == width => self.write_fixed(code, v),
            Some((code, width)) => Err(Error::invalid_value(format!(
                "{} takes {} bytes, found {}",
                code,
                width,
                v.len()
            ))),
            None => self.write_variable(v, EncodingCodes::VBin8, EncodingCodes::VBin32),
        }
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.serialize_unit()
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.write_constructor(EncodingCodes::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.serialize_u32(variant_index)
    }

    // Newtype names select the AMQP primitive the wrapped value is written as
    fn serialize_newtype_struct<T: ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        self.new_type = NewType::from_name(name);
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        if name == DESCRIPTOR {
            // The remaining elements of an array share the descriptor of the first
            if let IsArrayElement::OtherElement(_) = self.is_array_elem {
                return Ok(());
            }
            self.writer.write_all(&[EncodingCodes::DescribedType as u8])?;
            value.serialize(&mut Serializer::new(&mut self.writer))
        } else {
            let value = to_vec(value)?;
            self.write_variant(variant_index, &value)
        }
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        let is_array = std::mem::take(&mut self.new_type) == NewType::Array;
        Ok(SeqSerializer::new(self, is_array))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(SeqSerializer::new(self, false))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(SeqSerializer::new(self, false))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(VariantSerializer::new(self, variant_index))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapSerializer::new(self))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        let encoding = match name {
            DESCRIBED_BASIC => StructEncoding::DescribedBasic,
            DESCRIBED_LIST => StructEncoding::DescribedList,
            _ => StructEncoding::List,
        };
        Ok(StructSerializer::new(self, encoding))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(VariantSerializer::new(self, variant_index))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Serializer for sequences, tuples and tuple structs
///
/// A sequence is a list unless it is wrapped in an
/// [`Array`](crate::primitives::Array)
#[derive(Debug)]
pub struct SeqSerializer<'a, W: 'a> {
    se: &'a mut Serializer<W>,
    is_array: bool,
    num: usize,
    buf: Vec<u8>,
    elem_code: Option<EncodingCodes>,
}

impl<'a, W: 'a> SeqSerializer<'a, W> {
    fn new(se: &'a mut Serializer<W>, is_array: bool) -> Self {
        Self {
            se,
            is_array,
            num: 0,
            buf: Vec::new(),
            elem_code: None,
        }
    }
}

impl<'a, W: Write + 'a> SeqSerializer<'a, W> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        if self.is_array {
            let position = match self.elem_code {
                None => IsArrayElement::FirstElement,
                Some(code) => IsArrayElement::OtherElement(code),
            };
            let mut serializer = Serializer::array_element(&mut self.buf, position);
            value.serialize(&mut serializer)?;
            if self.elem_code.is_none() {
                self.elem_code = serializer.elem_code;
            }
        } else {
            let mut serializer = Serializer::new(&mut self.buf);
            value.serialize(&mut serializer)?;
        }
        self.num += 1;
        Ok(())
    }

    fn finish(self) -> Result<(), Error> {
        let Self {
            se,
            is_array,
            num,
            mut buf,
            elem_code,
        } = self;
        if !is_array {
            return se.write_list(num, &buf);
        }
        if elem_code.is_none() {
            // An empty array still carries an element constructor
            buf.push(EncodingCodes::Null as u8);
        }
        se.write_array(num, &buf)
    }
}

impl<'a, W: Write + 'a> ser::SerializeSeq for SeqSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<'a, W: Write + 'a> ser::SerializeTuple for SeqSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<'a, W: Write + 'a> ser::SerializeTupleStruct for SeqSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

/// Serializer for map types
#[derive(Debug)]
pub struct MapSerializer<'a, W: 'a> {
    se: &'a mut Serializer<W>,
    num: usize,
    buf: Vec<u8>,
}

impl<'a, W: 'a> MapSerializer<'a, W> {
    fn new(se: &'a mut Serializer<W>) -> Self {
        Self {
            se,
            num: 0,
            buf: Vec::new(),
        }
    }
}

// The count of a map covers keys and values
impl<'a, W: Write + 'a> ser::SerializeMap for MapSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        key.serialize(&mut Serializer::new(&mut self.buf))?;
        self.num += 1;
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        value.serialize(&mut Serializer::new(&mut self.buf))?;
        self.num += 1;
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self { se, num, buf } = self;
        se.write_map(num, &buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructEncoding {
    /// A plain struct is a list of its fields
    List,

    /// Descriptor followed by a list of the remaining fields
    DescribedList,

    /// Descriptor followed by a single value
    DescribedBasic,
}

/// A serializer for struct types
#[derive(Debug)]
pub struct StructSerializer<'a, W: 'a> {
    se: &'a mut Serializer<W>,
    encoding: StructEncoding,
    count: usize,
    buf: Vec<u8>,
}

impl<'a, W: 'a> StructSerializer<'a, W> {
    fn new(se: &'a mut Serializer<W>, encoding: StructEncoding) -> Self {
        Self {
            se,
            encoding,
            count: 0,
            buf: Vec::new(),
        }
    }
}

impl<'a, W: Write + 'a> ser::SerializeStruct for StructSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        if key == DESCRIPTOR {
            return value.serialize(&mut *self.se);
        }
        match self.encoding {
            StructEncoding::DescribedBasic => value.serialize(&mut *self.se),
            StructEncoding::List | StructEncoding::DescribedList => {
                value.serialize(&mut Serializer::new(&mut self.buf))?;
                self.count += 1;
                Ok(())
            }
        }
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        match self.encoding {
            StructEncoding::DescribedBasic => Ok(()),
            StructEncoding::List | StructEncoding::DescribedList => {
                self.se.write_list(self.count, &self.buf)
            }
        }
    }
}

/// Serializer for tuple and struct variants, written as a map from the
/// variant index to the list of fields
#[derive(Debug)]
pub struct VariantSerializer<'a, W: 'a> {
    se: &'a mut Serializer<W>,
    variant_index: u32,
    count: usize,
    buf: Vec<u8>,
}

impl<'a, W: 'a> VariantSerializer<'a, W> {
    fn new(se: &'a mut Serializer<W>, variant_index: u32) -> Self {
        Self {
            se,
            variant_index,
            count: 0,
            buf: Vec::new(),
        }
    }
}

impl<'a, W: Write + 'a> VariantSerializer<'a, W> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(&mut Serializer::new(&mut self.buf))?;
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> Result<(), Error> {
        let mut list = Vec::new();
        Serializer::new(&mut list).write_list(self.count, &self.buf)?;
        self.se.write_variant(self.variant_index, &list)
    }
}

impl<'a, W: Write + 'a> ser::SerializeTupleVariant for VariantSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<'a, W: Write + 'a> ser::SerializeStructVariant for VariantSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_bytes::ByteBuf;

    use crate::{
        described::Described,
        primitives::{Array, OrderedMap, Symbol, Timestamp, Uuid},
        Error, Value,
    };

    use super::{to_vec, write_to_slice};

    fn assert_encoding<T: Serialize>(value: &T, expected: &[u8]) {
        let buf = to_vec(value).unwrap();
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_serialize_bool() {
        assert_encoding(&true, &[0x41]);
        assert_encoding(&Value::Bool(false), &[0x42]);
    }

    #[test]
    fn test_serialize_uint() {
        assert_encoding(&0u32, &[0x43]);
        assert_encoding(&255u32, &[0x52, 0xff]);
        assert_encoding(&Value::UInt(256), &[0x70, 0, 0, 1, 0]);
    }

    #[test]
    fn test_serialize_ulong() {
        assert_encoding(&0u64, &[0x44]);
        assert_encoding(&0x10u64, &[0x53, 0x10]);
        assert_encoding(&(1u64 << 32), &[0x80, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_serialize_int() {
        assert_encoding(&-1i32, &[0x54, 0xff]);
        assert_encoding(&128i32, &[0x71, 0, 0, 0, 0x80]);
        assert_encoding(&7i64, &[0x55, 7]);
    }

    #[test]
    fn test_serialize_str() {
        assert_encoding(&"amqp", &[0xa1, 4, b'a', b'm', b'q', b'p']);
        let long = "a".repeat(256);
        let buf = to_vec(&long).unwrap();
        assert_eq!(&buf[..5], &[0xb1, 0, 0, 1, 0]);
        assert_eq!(buf.len(), 5 + 256);
    }

    #[test]
    fn test_serialize_multibyte_str_counts_bytes() {
        assert_encoding(&"é", &[0xa1, 2, 0xc3, 0xa9]);
    }

    #[test]
    fn test_serialize_symbol_and_binary() {
        assert_encoding(&Symbol::from("ab"), &[0xa3, 2, b'a', b'b']);
        assert_encoding(&ByteBuf::from(vec![1, 2]), &[0xa0, 2, 1, 2]);
    }

    #[test]
    fn test_serialize_timestamp_and_uuid() {
        assert_encoding(&Timestamp(1), &[0x83, 0, 0, 0, 0, 0, 0, 0, 1]);
        let buf = to_vec(&Uuid([7; 16])).unwrap();
        assert_eq!(buf[0], 0x98);
        assert_eq!(buf.len(), 17);
    }

    #[test]
    fn test_serialize_list() {
        assert_encoding(&Value::List(vec![]), &[0x45]);
        // size covers the count byte and both items
        assert_encoding(
            &Value::List(vec![Value::UInt(1), Value::Null]),
            &[0xc0, 4, 2, 0x52, 1, 0x40],
        );
    }

    #[test]
    fn test_serialize_map() {
        let mut map = OrderedMap::new();
        map.insert(Value::from("sequence"), Value::Int(1));
        let mut expected = vec![0xc1, 13, 2, 0xa1, 8];
        expected.extend_from_slice(b"sequence");
        expected.extend_from_slice(&[0x54, 1]);
        assert_encoding(&Value::Map(map), &expected);
    }

    #[test]
    fn test_serialize_array_uses_wide_constructor() {
        let array = Array::new(vec![Value::UInt(1), Value::UInt(2)]).unwrap();
        assert_encoding(
            &Value::Array(array),
            &[0xe0, 10, 2, 0x70, 0, 0, 0, 1, 0, 0, 0, 2],
        );
    }

    #[test]
    fn test_serialize_empty_array() {
        assert_encoding(&Array::<Symbol>::default(), &[0xe0, 2, 0, 0x40]);
    }

    #[test]
    fn test_serialize_array_of_described() {
        let array = Array::from(vec![
            Described::new(0x24u64, 1i32),
            Described::new(0x24u64, 2i32),
        ]);
        assert_encoding(
            &array,
            &[0xe0, 13, 2, 0x00, 0x53, 0x24, 0x71, 0, 0, 0, 1, 0, 0, 0, 2],
        );
    }

    #[test]
    fn test_serialize_mixed_array_is_an_error() {
        let array = Array::from(vec![Value::UInt(1), Value::from("a")]);
        assert!(matches!(to_vec(&array), Err(Error::HeterogeneousArray)));
    }

    #[test]
    fn test_serialize_described() {
        let value = Value::from(Described::new(0x24u64, Value::List(vec![])));
        assert_encoding(&value, &[0x00, 0x53, 0x24, 0x45]);

        let named = Described::new(Symbol::from("a:b"), 1u32);
        assert_encoding(&named, &[0x00, 0xa3, 3, b'a', b':', b'b', 0x52, 1]);
    }

    #[test]
    fn write_to_short_slice_overflows_without_writing() {
        let value = Value::from("hello");
        let mut slice = [0u8; 4];
        let err = write_to_slice(&value, &mut slice).unwrap_err();
        assert!(matches!(
            err,
            Error::Overflow {
                required: 7,
                available: 4
            }
        ));
        assert_eq!(slice, [0u8; 4]);

        let mut slice = [0u8; 16];
        assert_eq!(write_to_slice(&value, &mut slice).unwrap(), 7);
        assert_eq!(&slice[..2], &[0xa1, 5]);
    }
}
