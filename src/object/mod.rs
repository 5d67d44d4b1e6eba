//! Object model shared by builders and host code

mod component;
mod record;
mod value;

pub use component::{
    get_property, property_access, read_path, set_property, Component, ComponentError,
    ComponentParent, DynamicProperties, PropertyAccess, Prototype,
};
pub use record::Record;
pub use value::{
    BigPoint3, Colour, EntryRef, ListRef, MapEntry, ObjectRef, Point3, Table, TableRef, Value,
    Vector2, Vector3,
};
