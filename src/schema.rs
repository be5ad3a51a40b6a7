use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{DefinitionError, Field, FieldOptions, FieldType, Label};

/// The fields of a message type, in declaration order.
///
/// Built once through [`MessageSchemaBuilder`] and shared read-only behind an [`Arc`] by every
/// message of the type.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageSchema {
    name: String,
    fields: Vec<Field>,
    by_name: BTreeMap<String, usize>,
    by_number: BTreeMap<u32, usize>,
}

impl MessageSchema {
    /// Start declaring a message type.
    pub fn builder(name: impl Into<String>) -> MessageSchemaBuilder {
        MessageSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn field_by_number(&self, number: u32) -> Option<&Field> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    /// Position of the named field in declaration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn index_of_number(&self, number: u32) -> Option<usize> {
        self.by_number.get(&number).copied()
    }
}

/// Builder for [`MessageSchema`].
///
/// The first invalid declaration is reported by [`build`](Self::build).
#[derive(Debug)]
pub struct MessageSchemaBuilder {
    name: String,
    fields: Vec<Field>,
    error: Option<DefinitionError>,
}

impl MessageSchemaBuilder {
    /// Declare a required field.
    pub fn required(self, ty: impl Into<FieldType>, name: impl Into<String>, number: u32) -> Self {
        self.declare(ty.into(), name, number, Label::Required, FieldOptions::new())
    }

    pub fn required_with(
        self,
        ty: impl Into<FieldType>,
        name: impl Into<String>,
        number: u32,
        options: FieldOptions,
    ) -> Self {
        self.declare(ty.into(), name, number, Label::Required, options)
    }

    /// Declare an optional field.
    pub fn optional(self, ty: impl Into<FieldType>, name: impl Into<String>, number: u32) -> Self {
        self.declare(ty.into(), name, number, Label::Optional, FieldOptions::new())
    }

    pub fn optional_with(
        self,
        ty: impl Into<FieldType>,
        name: impl Into<String>,
        number: u32,
        options: FieldOptions,
    ) -> Self {
        self.declare(ty.into(), name, number, Label::Optional, options)
    }

    /// Declare a repeated field.
    pub fn repeated(self, ty: impl Into<FieldType>, name: impl Into<String>, number: u32) -> Self {
        self.declare(ty.into(), name, number, Label::Repeated, FieldOptions::new())
    }

    pub fn repeated_with(
        self,
        ty: impl Into<FieldType>,
        name: impl Into<String>,
        number: u32,
        options: FieldOptions,
    ) -> Self {
        self.declare(ty.into(), name, number, Label::Repeated, options)
    }

    fn declare(self, ty: FieldType, name: impl Into<String>, number: u32, label: Label, options: FieldOptions) -> Self {
        let field = Field::new(ty, name, number, label, options);
        self.field(field)
    }

    /// Add an already constructed field.
    pub fn field(mut self, field: Result<Field, DefinitionError>) -> Self {
        if self.error.is_none() {
            match field {
                Ok(field) => self.fields.push(field),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Finish the schema, failing on the first invalid or conflicting declaration.
    pub fn build(self) -> Result<Arc<MessageSchema>, DefinitionError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut by_name = BTreeMap::new();
        let mut by_number = BTreeMap::new();
        for (i, field) in self.fields.iter().enumerate() {
            if by_name.insert(String::from(field.name()), i).is_some() {
                return Err(DefinitionError::DuplicateName {
                    message: self.name,
                    field: field.name().into(),
                });
            }
            if by_number.insert(field.number(), i).is_some() {
                return Err(DefinitionError::DuplicateNumber {
                    message: self.name,
                    number: field.number(),
                });
            }
        }

        Ok(Arc::new(MessageSchema {
            name: self.name,
            fields: self.fields,
            by_name,
            by_number,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnumDescriptor, Value};

    #[test]
    fn declaration_order() {
        let schema = MessageSchema::builder("Request")
            .required(FieldType::String, "name", 2)
            .optional(FieldType::Int32, "count", 1)
            .repeated_with(FieldType::Sint64, "ids", 3, FieldOptions::new().packed())
            .build()
            .unwrap();

        let names = schema.fields().iter().map(Field::name).collect::<Vec<_>>();
        assert_eq!(names, ["name", "count", "ids"]);
        assert_eq!(schema.field("count").map(Field::number), Some(1));
        assert_eq!(schema.field_by_number(3).map(Field::name), Some("ids"));
        assert!(schema.field("ids").unwrap().is_packed());
        assert!(schema.field("name").unwrap().is_required());
        assert!(!schema.field("count").unwrap().is_required());
        assert!(schema.field("missing").is_none());
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn embedded_and_enum_types() {
        let command = MessageSchema::builder("Command")
            .required(FieldType::String, "name", 1)
            .build()
            .unwrap();
        let kind = Arc::new(EnumDescriptor::new("Type").value("QUERY", 0).value("COUNT", 1));
        let schema = MessageSchema::builder("Request")
            .required(command.clone(), "command", 2)
            .required_with(kind.clone(), "message_type", 1, FieldOptions::new().with_default(1))
            .optional(kind, "other_type", 3)
            .build()
            .unwrap();

        let field = schema.field("command").unwrap();
        assert_eq!(field.ty(), &FieldType::Message(command));
        assert_eq!(field.number(), 2);

        let field = schema.field("message_type").unwrap();
        assert!(matches!(field.ty(), FieldType::Enum(e) if e.name() == "Type"));
        assert_eq!(field.default(), Some(&Value::Int(1)));
        assert_eq!(schema.field("other_type").unwrap().default(), None);
    }

    #[test]
    fn unpackable_fails_build() {
        let res = MessageSchema::builder("Request")
            .repeated_with(FieldType::String, "names", 1, FieldOptions::new().packed())
            .optional(FieldType::Int32, "count", 2)
            .build();
        assert_eq!(
            res,
            Err(DefinitionError::Unpackable {
                field: "names".into(),
                ty: "string".into()
            })
        );
    }

    #[test]
    fn duplicates() {
        let res = MessageSchema::builder("Request")
            .optional(FieldType::Int32, "a", 1)
            .optional(FieldType::Int32, "a", 2)
            .build();
        assert_eq!(
            res,
            Err(DefinitionError::DuplicateName {
                message: "Request".into(),
                field: "a".into()
            })
        );

        let res = MessageSchema::builder("Request")
            .optional(FieldType::Int32, "a", 1)
            .optional(FieldType::Int32, "b", 1)
            .build();
        assert_eq!(
            res,
            Err(DefinitionError::DuplicateNumber {
                message: "Request".into(),
                number: 1
            })
        );
    }
}
