//! The record-shaped adapted families: structured records, model records,
//! and enumerations.

use std::fmt;
use std::sync::Arc;

use crate::error::HookError;
use crate::value::Value;

/// How a structured-record field was declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// An ordinary instance field.
    Instance,
    /// Consumed during initialization; carries no per-instance state.
    InitOnly,
    /// A class-level constant shared by all instances.
    ClassConst,
}

/// One declared field of a structured record. Descriptor-mediated fields
/// arrive with their effective value already read.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    value: Value,
    kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<Value>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    /// An ordinary instance field.
    pub fn instance(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, value, FieldKind::Instance)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// A structured record: a named type with an ordered set of declared
/// fields.
///
/// Encodes as a map of field name to field value in declaration order.
/// Underscore-prefixed, initialization-only, and class-constant fields are
/// skipped; an empty record (or one with nothing left after skipping)
/// encodes as an empty map.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    name: String,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The fields that reach the wire, in declaration order.
    pub(crate) fn wire_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Instance && !f.name.starts_with('_'))
    }
}

/// An enumeration member: a name plus the underlying value it reduces to.
/// The underlying value re-enters the classifier, so int-, str-, float-,
/// and arbitrary-valued enumerations all work.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue {
    name: String,
    value: Value,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// The model-record framework's "dump to plain mapping" operation.
///
/// Implementations should prefer the dump that includes dynamic subclass
/// fields. The returned value (normally a `Value::Map`) is encoded
/// recursively; a failed dump aborts the encode with the failure attached
/// as the cause.
pub trait ModelDump: Send + Sync {
    /// Name of the model type, for error messages.
    fn type_name(&self) -> &str;

    /// Produce the plain-mapping form of the model.
    fn dump(&self) -> Result<Value, HookError>;
}

/// Shared handle to a model record inside a [`Value`].
///
/// Equality is handle identity: two handles are equal only when they point
/// at the same model instance, since a dump operation can't be compared
/// structurally.
#[derive(Clone)]
pub struct ModelHandle(Arc<dyn ModelDump>);

impl ModelHandle {
    pub fn new(model: impl ModelDump + 'static) -> Self {
        Self(Arc::new(model))
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn dump(&self) -> Result<Value, HookError> {
        self.0.dump()
    }
}

impl PartialEq for ModelHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelHandle")
            .field(&self.0.type_name())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Map;

    #[test]
    fn wire_fields_skip_rules() {
        let record = Record::new(
            "Fixture",
            vec![
                Field::instance("a", "a"),
                Field::instance("b", 1u8),
                Field::instance("_c", "hidden"),
                Field::new("d", "cls", FieldKind::ClassConst),
                Field::new("e", "init", FieldKind::InitOnly),
            ],
        );
        let names: Vec<_> = record.wire_fields().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn empty_record() {
        let record = Record::new("Empty", Vec::new());
        assert_eq!(record.wire_fields().count(), 0);
    }

    #[test]
    fn model_handle_identity() {
        struct Fixed;
        impl ModelDump for Fixed {
            fn type_name(&self) -> &str {
                "Fixed"
            }
            fn dump(&self) -> Result<Value, HookError> {
                Ok(Value::Map(Map::new()))
            }
        }
        let a = ModelHandle::new(Fixed);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, ModelHandle::new(Fixed));
    }
}
