//! Attachment of a child's object into its parent's object

use tracing::trace;

use crate::object::{
    get_property, property_access, set_property, ComponentError, PropertyAccess, Value,
};

/// Where a child ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Property,
    DynamicProperty,
    Child,
    ListItem,
    EntrySlot,
    TableEntry,
    /// The parent offers no attachment point for this child
    Unattached,
}

/// Attach `child` into `parent`, trying in order: explicit property path,
/// explicit dynamic key, parent composition, list, entry shell, table.
pub fn link(
    child: &Value,
    parent: &Value,
    property: Option<&str>,
    dyn_key: Option<&str>,
) -> Result<Attachment, ComponentError> {
    if let Some(path) = property {
        link_property(child, parent, path)?;
        return Ok(Attachment::Property);
    }
    if let Some(key) = dyn_key {
        return match parent {
            Value::Object(object) => {
                let mut object = object.borrow_mut();
                let type_name = object.type_name().to_string();
                let properties = object.dynamic_properties().ok_or_else(|| {
                    ComponentError::failed(format!("type '{}' has no dynamic properties", type_name))
                })?;
                properties.insert(key.to_string(), child.clone());
                Ok(Attachment::DynamicProperty)
            }
            other => Err(ComponentError::failed(format!(
                "type '{}' has no dynamic properties",
                other.type_name()
            ))),
        };
    }

    let attachment = match parent {
        Value::Object(object) => {
            let mut object = object.borrow_mut();
            match object.as_parent() {
                Some(composite) => {
                    composite.add_child(child.clone())?;
                    Attachment::Child
                }
                None => Attachment::Unattached,
            }
        }
        Value::List(items) => {
            items.borrow_mut().push(child.clone());
            Attachment::ListItem
        }
        Value::Entry(entry) => {
            let mut entry = entry.borrow_mut();
            if entry.key.is_none() {
                entry.key = Some(child.clone());
            } else if entry.value.is_none() {
                entry.value = Some(child.clone());
            } else {
                return Err(ComponentError::failed("dictionary entry already has a key and a value"));
            }
            Attachment::EntrySlot
        }
        Value::Table(_) => match child {
            Value::Entry(_) => {
                insert_entry(parent, child)?;
                return Ok(Attachment::TableEntry);
            }
            _ => Attachment::Unattached,
        },
        _ => Attachment::Unattached,
    };

    if matches!(attachment, Attachment::Child | Attachment::ListItem) {
        notify_attached(child, parent);
    }
    Ok(attachment)
}

/// Walk all but the last path segment, then assign or append at the last
fn link_property(child: &Value, parent: &Value, path: &str) -> Result<(), ComponentError> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, walk)) = segments.split_last() else {
        return Err(ComponentError::failed("empty property path"));
    };
    let mut target = parent.clone();
    for segment in walk {
        target = get_property(&target, segment)?;
    }

    let access = property_access(&target, last);
    match access {
        PropertyAccess::Missing => {
            return Err(ComponentError::no_such_property(target.type_name(), *last))
        }
        PropertyAccess::WriteOnly => return set_property(&target, last, child.clone()),
        PropertyAccess::ReadOnly | PropertyAccess::ReadWrite => {}
    }

    match get_property(&target, last) {
        Ok(collection @ Value::List(_)) => {
            trace!(property = *last, "appending to collection property");
            link(child, &collection, None, None).map(|_| ())
        }
        Ok(collection @ Value::Table(_)) if matches!(child, Value::Entry(_)) => {
            insert_entry(&collection, child)
        }
        _ if access.can_write() => set_property(&target, last, child.clone()),
        Ok(_) => Err(ComponentError::ReadOnly {
            type_name: target.type_name(),
            property: last.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Insert a filled entry shell into a table
fn insert_entry(table: &Value, entry: &Value) -> Result<(), ComponentError> {
    let (Value::Table(table), Value::Entry(shell)) = (table, entry) else {
        return Err(ComponentError::mismatch("dictionaryEntry", entry));
    };
    let (key, value) = shell.borrow().pair().ok_or_else(|| {
        ComponentError::failed("dictionary entry needs both a key and a value")
    })?;
    table.borrow_mut().insert(key, value.clone())?;
    notify_attached(&value, &Value::Table(table.clone()));
    Ok(())
}

fn notify_attached(child: &Value, parent: &Value) {
    if let Value::Object(object) = child {
        object.borrow_mut().on_attached(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_composition_notifies_child() {
        let parent = Value::object(Record::new("Scene"));
        let child = Value::object(Record::new("Light"));
        assert_eq!(link(&child, &parent, None, None), Ok(Attachment::Child));
        let children = parent.with_object(|r: &Record| r.children()).unwrap();
        assert!(children[0].same(&child));
        let parents = child.with_object(|r: &Record| r.parents().to_vec()).unwrap();
        assert!(parents[0].same(&parent));
    }

    #[test]
    fn test_property_path_appends_to_collections() {
        let parent = Value::object(Record::new("Scene").with_property("Items", Value::new_list()));
        link(&1.into(), &parent, Some("Items"), None).unwrap();
        link(&2.into(), &parent, Some("Items"), None).unwrap();
        let items = parent
            .with_object(|r: &Record| r.property("Items").cloned())
            .flatten()
            .and_then(|v| v.list_items())
            .unwrap();
        assert_eq!(items, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_property_path_assigns_scalars() {
        let inner = Value::object(Record::new("Transform"));
        let parent = Value::object(Record::new("Node").with_property("Transform", inner.clone()));
        link(&3.into(), &parent, Some("Transform.Scale"), None).unwrap();
        assert_eq!(
            inner.with_object(|r: &Record| r.property("Scale").cloned()),
            Some(Some(Value::Int(3)))
        );
        // an unset property is assigned, not appended to
        link(&4.into(), &parent, Some("Other"), None).unwrap();
    }

    #[test]
    fn test_dynamic_key() {
        let parent = Value::object(Record::new("Node"));
        assert_eq!(link(&5.into(), &parent, None, Some("speed")), Ok(Attachment::DynamicProperty));
        assert_eq!(
            parent.with_object(|r: &Record| r.dynamic().get("speed").cloned()),
            Some(Some(Value::Int(5)))
        );
        assert!(link(&5.into(), &Value::new_list(), None, Some("speed")).is_err());
    }

    #[test]
    fn test_entry_slots_then_table() {
        let table = Value::new_table();
        let entry = Value::new_entry();
        assert_eq!(link(&"a".into(), &entry, None, None), Ok(Attachment::EntrySlot));
        assert!(link(&entry, &table, None, None).is_err());
        link(&1.into(), &entry, None, None).unwrap();
        assert_eq!(link(&entry, &table, None, None), Ok(Attachment::TableEntry));
        assert!(link(&entry, &table, None, None).is_err());
        let table = table.as_table().unwrap().borrow();
        assert_eq!(table.get_str("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_no_attachment_point() {
        assert_eq!(link(&1.into(), &Value::Int(2), None, None), Ok(Attachment::Unattached));
        assert_eq!(link(&1.into(), &Value::new_table(), None, None), Ok(Attachment::Unattached));
    }
}
