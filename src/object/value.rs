//! Runtime values produced by builders
//!
//! Literal values are stored inline. Containers and host objects are shared
//! through `Rc<RefCell<..>>` so that the same instance can be referenced from
//! several places in the graph (cycles included); [`Value::same`] compares
//! those by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use super::component::{Component, ComponentError};
use crate::registry::TypeHandle;

pub type ObjectRef = Rc<RefCell<dyn Component>>;
pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type TableRef = Rc<RefCell<Table>>;
pub type EntryRef = Rc<RefCell<MapEntry>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Integer point for coordinates that do not fit a float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BigPoint3 {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Look up a named colour (case-insensitive)
    pub fn named(name: &str) -> Option<Self> {
        let rgb = match name.to_ascii_lowercase().as_str() {
            "transparent" => return Some(Self::rgba(0, 0, 0, 0)),
            "black" => (0, 0, 0),
            "white" => (255, 255, 255),
            "red" => (255, 0, 0),
            "green" => (0, 128, 0),
            "lime" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "yellow" => (255, 255, 0),
            "cyan" | "aqua" => (0, 255, 255),
            "magenta" | "fuchsia" => (255, 0, 255),
            "gray" | "grey" => (128, 128, 128),
            "silver" => (192, 192, 192),
            "maroon" => (128, 0, 0),
            "olive" => (128, 128, 0),
            "navy" => (0, 0, 128),
            "purple" => (128, 0, 128),
            "teal" => (0, 128, 128),
            "orange" => (255, 165, 0),
            "brown" => (165, 42, 42),
            "pink" => (255, 192, 203),
            _ => return None,
        };
        Some(Self::rgba(rgb.0, rgb.1, rgb.2, 255))
    }
}

/// Key/value pair shell filled in by a `dictionaryEntry` before it joins a table
#[derive(Debug, Clone, Default)]
pub struct MapEntry {
    pub key: Option<Value>,
    pub value: Option<Value>,
}

impl MapEntry {
    /// Key and value, once both slots are filled
    pub fn pair(&self) -> Option<(Value, Value)> {
        Some((self.key.clone()?, self.value.clone()?))
    }
}

/// Insertion-ordered map keyed by [`Value`] equality
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<(Value, Value)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a string key
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Add a new entry; adding an existing key is an error
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), ComponentError> {
        if self.contains_key(&key) {
            return Err(ComponentError::DuplicateKey {
                key: key.to_string(),
            });
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// A materialized build object
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    Byte(u8),
    SByte(i8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Guid(Uuid),
    Vector2(Vector2),
    Vector3(Vector3),
    Point3(Point3),
    BigPoint3(BigPoint3),
    Colour(Colour),
    Type(TypeHandle),
    List(ListRef),
    Table(TableRef),
    Entry(EntryRef),
    Object(ObjectRef),
}

impl Value {
    /// Wrap a host object
    pub fn object<C: Component>(component: C) -> Self {
        let object: ObjectRef = Rc::new(RefCell::new(component));
        Value::Object(object)
    }

    pub fn new_list() -> Self {
        Value::List(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn list_of(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn new_table() -> Self {
        Value::Table(Rc::new(RefCell::new(Table::new())))
    }

    pub fn new_entry() -> Self {
        Value::Entry(Rc::new(RefCell::new(MapEntry::default())))
    }

    /// Runtime type name, used for overload matching and messages
    pub fn type_name(&self) -> String {
        match self {
            Value::Bool(_) => "bool".into(),
            Value::Char(_) => "char".into(),
            Value::Byte(_) => "byte".into(),
            Value::SByte(_) => "sbyte".into(),
            Value::Short(_) => "short".into(),
            Value::UShort(_) => "ushort".into(),
            Value::Int(_) => "int".into(),
            Value::UInt(_) => "uint".into(),
            Value::Long(_) => "long".into(),
            Value::ULong(_) => "ulong".into(),
            Value::Float(_) => "float".into(),
            Value::Double(_) => "double".into(),
            Value::String(_) => "string".into(),
            Value::Guid(_) => "guid".into(),
            Value::Vector2(_) => "vector2".into(),
            Value::Vector3(_) => "vector3".into(),
            Value::Point3(_) => "point3".into(),
            Value::BigPoint3(_) => "bigPoint3".into(),
            Value::Colour(_) => "colour".into(),
            Value::Type(_) => "type".into(),
            Value::List(_) => "list".into(),
            Value::Table(_) => "table".into(),
            Value::Entry(_) => "dictionaryEntry".into(),
            Value::Object(o) => o.borrow().type_name().to_string(),
        }
    }

    /// Identity comparison: pointer equality for shared values, value
    /// equality for inline ones
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Entry(a), Value::Entry(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => self == other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant widened to i64 (ulong only when it fits)
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v.into()),
            Value::SByte(v) => Some(v.into()),
            Value::Short(v) => Some(v.into()),
            Value::UShort(v) => Some(v.into()),
            Value::Int(v) => Some(v.into()),
            Value::UInt(v) => Some(v.into()),
            Value::Long(v) => Some(v),
            Value::ULong(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v.into()),
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow a host object as its concrete type
    pub fn with_object<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let object = self.as_object()?;
        let borrowed = object.borrow();
        borrowed.as_any().downcast_ref::<T>().map(f)
    }

    /// Mutably borrow a host object as its concrete type
    pub fn with_object_mut<T: Component, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let object = self.as_object()?;
        let mut borrowed = object.borrow_mut();
        borrowed.as_any_mut().downcast_mut::<T>().map(f)
    }

    /// Snapshot of a list's items
    pub fn list_items(&self) -> Option<Vec<Value>> {
        self.as_list().map(|l| l.borrow().clone())
    }

    /// Multi-line rendering of the graph reachable from this value.
    /// Shared values seen before are printed as back-references.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut seen: Vec<*const ()> = Vec::new();
        describe_into(self, 0, &mut seen, &mut out);
        out
    }

    fn shared_ptr(&self) -> Option<*const ()> {
        match self {
            Value::List(l) => Some(Rc::as_ptr(l) as *const ()),
            Value::Table(t) => Some(Rc::as_ptr(t) as *const ()),
            Value::Entry(e) => Some(Rc::as_ptr(e) as *const ()),
            Value::Object(o) => Some(Rc::as_ptr(o) as *const ()),
            _ => None,
        }
    }
}

fn describe_into(value: &Value, depth: usize, seen: &mut Vec<*const ()>, out: &mut String) {
    let indent = "  ".repeat(depth);
    if let Some(ptr) = value.shared_ptr() {
        if seen.contains(&ptr) {
            out.push_str(&format!("{}^{}\n", indent, value));
            return;
        }
        seen.push(ptr);
    }
    match value {
        Value::List(items) => {
            out.push_str(&format!("{}list\n", indent));
            for item in items.borrow().iter() {
                describe_into(item, depth + 1, seen, out);
            }
        }
        Value::Table(table) => {
            out.push_str(&format!("{}table\n", indent));
            for (key, item) in table.borrow().iter() {
                out.push_str(&format!("{}  {} =>\n", indent, key));
                describe_into(item, depth + 2, seen, out);
            }
        }
        Value::Object(object) => {
            let object = object.borrow();
            out.push_str(&format!("{}{}\n", indent, value));
            for (name, item) in object.describe_properties() {
                out.push_str(&format!("{}  .{} =\n", indent, name));
                describe_into(&item, depth + 2, seen, out);
            }
        }
        _ => out.push_str(&format!("{}{}\n", indent, value)),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::SByte(a), Value::SByte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::UShort(a), Value::UShort(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::ULong(a), Value::ULong(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::Vector2(a), Value::Vector2(b)) => a == b,
            (Value::Vector3(a), Value::Vector3(b)) => a == b,
            (Value::Point3(a), Value::Point3(b)) => a == b,
            (Value::BigPoint3(a), Value::BigPoint3(b)) => a == b,
            (Value::Colour(a), Value::Colour(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::List(_), Value::List(_))
            | (Value::Table(_), Value::Table(_))
            | (Value::Entry(_), Value::Entry(_))
            | (Value::Object(_), Value::Object(_)) => self.same(other),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "'{}'", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::SByte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::UShort(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::ULong(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Guid(v) => write!(f, "{}", v),
            Value::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Point3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::BigPoint3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Colour(c) => write!(f, "#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a),
            Value::Type(t) => write!(f, "type {}", t),
            Value::List(l) => write!(f, "list[{}]", l.borrow().len()),
            Value::Table(t) => write!(f, "table[{}]", t.borrow().len()),
            Value::Entry(_) => write!(f, "dictionaryEntry"),
            Value::Object(o) => {
                let object = o.borrow();
                match object.name() {
                    Some(name) => write!(f, "{} \"{}\"", object.type_name(), name),
                    None => write!(f, "{}", object.type_name()),
                }
            }
        }
    }
}

// Shared values print shallowly: the graph may contain cycles.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(_) | Value::Table(_) | Value::Entry(_) | Value::Object(_) => {
                write!(f, "<{}>", self)
            }
            _ => write!(f, "{}({})", self.type_name(), self),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}
