//! Literal leaf elements
//!
//! Literals are parsed straight from their attributes during the create
//! pass and never have children.

use std::collections::BTreeMap;
use std::str::FromStr;

use uuid::Uuid;

use super::context::LoadParameters;
use super::error::LoadError;
use crate::object::{BigPoint3, Colour, Point3, Value, Vector2, Vector3};

const LITERAL_TAGS: &[&str] = &[
    "string",
    "bool",
    "char",
    "byte",
    "sbyte",
    "short",
    "ushort",
    "int",
    "uint",
    "long",
    "ulong",
    "float",
    "double",
    "guid",
    "point3",
    "vector2",
    "vector3",
    "bigPoint3",
    "colour",
    "dynProperty",
    "point2",
    "quat",
];

pub fn is_literal_tag(tag: &str) -> bool {
    LITERAL_TAGS.contains(&tag)
}

type Attributes = BTreeMap<String, String>;

/// Build the value of a literal element
pub fn parse_literal(tag: &str, attributes: &Attributes, parameters: &Value) -> Result<Value, LoadError> {
    let value = || attribute(tag, attributes, "value");
    let literal = match tag {
        "string" => Value::String(value()?.to_string()),
        "bool" => Value::Bool(parse_bool(tag, value()?)?),
        "char" => {
            let text = value()?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(malformed(tag, text)),
            }
        }
        "byte" => Value::Byte(parse_number(tag, value()?)?),
        "sbyte" => Value::SByte(parse_number(tag, value()?)?),
        "short" => Value::Short(parse_number(tag, value()?)?),
        "ushort" => Value::UShort(parse_number(tag, value()?)?),
        "int" => Value::Int(parse_number(tag, value()?)?),
        "uint" => Value::UInt(parse_number(tag, value()?)?),
        "long" => Value::Long(parse_number(tag, value()?)?),
        "ulong" => Value::ULong(parse_number(tag, value()?)?),
        "float" => Value::Float(parse_number(tag, value()?)?),
        "double" => Value::Double(parse_number(tag, value()?)?),
        "guid" => {
            let text = value()?;
            Value::Guid(Uuid::parse_str(text.trim()).map_err(|_| malformed(tag, text))?)
        }
        "point3" => {
            let [x, y, z] = components(tag, attributes, ["x", "y", "z"])?;
            Value::Point3(Point3 { x, y, z })
        }
        "vector3" => {
            let [x, y, z] = components(tag, attributes, ["x", "y", "z"])?;
            Value::Vector3(Vector3 { x, y, z })
        }
        "vector2" => {
            let [x, y] = components(tag, attributes, ["x", "y"])?;
            Value::Vector2(Vector2 { x, y })
        }
        "bigPoint3" => {
            let [x, y, z] = components(tag, attributes, ["x", "y", "z"])?;
            Value::BigPoint3(BigPoint3 { x, y, z })
        }
        "colour" => Value::Colour(parse_colour(attributes)?),
        "dynProperty" => {
            let key = value()?;
            parameters
                .with_object(|p: &LoadParameters| p.property(key).cloned())
                .flatten()
                .ok_or_else(|| LoadError::not_found_because(key, "no such load parameter"))?
        }
        other => {
            return Err(LoadError::grammar(format!(
                "<{}> is not supported",
                other
            )))
        }
    };
    Ok(literal)
}

fn attribute<'a>(tag: &str, attributes: &'a Attributes, name: &str) -> Result<&'a str, LoadError> {
    attributes
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| LoadError::missing_attribute(tag, name))
}

fn malformed(tag: &str, text: &str) -> LoadError {
    LoadError::grammar(format!("malformed <{}> literal '{}'", tag, text))
}

fn parse_bool(tag: &str, text: &str) -> Result<bool, LoadError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(malformed(tag, text)),
    }
}

fn parse_number<T: FromStr>(tag: &str, text: &str) -> Result<T, LoadError> {
    text.trim().parse().map_err(|_| malformed(tag, text))
}

fn components<T: FromStr + Copy + Default, const N: usize>(
    tag: &str,
    attributes: &Attributes,
    names: [&str; N],
) -> Result<[T; N], LoadError> {
    let mut out = [T::default(); N];
    for (slot, name) in out.iter_mut().zip(names) {
        *slot = parse_number(tag, attribute(tag, attributes, name)?)?;
    }
    Ok(out)
}

/// `value` holds a colour name or `#rrggbb[aa]`; otherwise `r`, `g`, `b`
/// and optional `a` hold 0-255 channels
fn parse_colour(attributes: &Attributes) -> Result<Colour, LoadError> {
    if let Some(text) = attributes.get("value") {
        return parse_hex(text)
            .or_else(|| Colour::named(text.trim()))
            .ok_or_else(|| malformed("colour", text));
    }
    let [r, g, b] = components::<u8, 3>("colour", attributes, ["r", "g", "b"])?;
    let a = match attributes.get("a") {
        Some(text) => parse_number("colour", text)?,
        None => 255,
    };
    Ok(Colour::rgba(r, g, b, a))
}

fn parse_hex(text: &str) -> Option<Colour> {
    let hex = text.trim().strip_prefix('#')?;
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Colour::rgba(channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some(Colour::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}
