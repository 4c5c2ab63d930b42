//! The in-memory schema model: elements, properties, comments, object-info
//! lines, and the chosen storage mode. Append-only while a handle builds or
//! parses it; read-only once a read or write pass starts.

use crate::error::{PlyError, Result};
use crate::types::ScalarKind;

/// Small-string-optimized token storage for element/property names: PLY
/// identifiers are short ASCII tokens in the overwhelming case, so this
/// avoids a heap allocation per property on both the parse and build path.
pub type Token = smallstr::SmallString<[u8; 16]>;

/// A single `comment` header line's text (sans the `comment ` keyword).
pub type Comment = String;

/// A single `obj_info` header line's text (sans the `obj_info` keyword).
pub type ObjInfo = String;

/// The on-disk encoding of value bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl StorageMode {
    /// Resolve the host's native endianness, for the `default`/`binary`
    /// create-time tokens.
    pub fn native_binary() -> Self {
        if cfg!(target_endian = "big") {
            StorageMode::BinaryBigEndian
        } else {
            StorageMode::BinaryLittleEndian
        }
    }

    pub fn is_binary(self) -> bool {
        !matches!(self, StorageMode::Ascii)
    }

    /// The text spelling used on the `format` header line.
    pub fn header_token(self) -> &'static str {
        match self {
            StorageMode::Ascii => "ascii",
            StorageMode::BinaryLittleEndian => "binary_little_endian",
            StorageMode::BinaryBigEndian => "binary_big_endian",
        }
    }
}

/// What kind of value a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarKind),
    List {
        length_kind: ScalarKind,
        value_kind: ScalarKind,
    },
}

/// A single named field within an element.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: Token,
    pub kind: PropertyKind,
}

impl Property {
    pub fn scalar(name: impl Into<Token>, kind: ScalarKind) -> Self {
        Property {
            name: name.into(),
            kind: PropertyKind::Scalar(kind),
        }
    }

    pub fn list(name: impl Into<Token>, length_kind: ScalarKind, value_kind: ScalarKind) -> Self {
        Property {
            name: name.into(),
            kind: PropertyKind::List {
                length_kind,
                value_kind,
            },
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, PropertyKind::List { .. })
    }
}

/// A named, ordered group of properties with a declared instance count.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: Token,
    pub count: usize,
    pub properties: Vec<Property>,
}

impl Element {
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

/// Stable index into `Schema::elements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementIndex(pub usize);

/// Stable index into an element's `properties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyIndex(pub usize);

/// The full header model: ordered elements, free-form comment/object-info
/// sequences, and the storage mode. Built append-only (`add_element` /
/// `add_property` / `add_comment` / `add_obj_info`), then frozen once the
/// header has been parsed (reading) or emitted (writing).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub elements: Vec<Element>,
    pub comments: Vec<String>,
    pub obj_infos: Vec<String>,
    pub mode: Option<StorageMode>,
}

impl Schema {
    pub fn new(mode: StorageMode) -> Self {
        Schema {
            elements: Vec::new(),
            comments: Vec::new(),
            obj_infos: Vec::new(),
            mode: Some(mode),
        }
    }

    pub fn add_element(&mut self, name: impl Into<Token>, count: usize) -> ElementIndex {
        let index = self.elements.len();
        self.elements.push(Element {
            name: name.into(),
            count,
            properties: Vec::new(),
        });
        ElementIndex(index)
    }

    pub fn add_property(
        &mut self,
        element: ElementIndex,
        property: Property,
    ) -> Result<PropertyIndex> {
        let element = self
            .elements
            .get_mut(element.0)
            .ok_or(PlyError::SchemaError("addProperty: no such element"))?;
        if element.properties.iter().any(|p| p.name == property.name) {
            return Err(PlyError::SchemaError(
                "addProperty: duplicate property name within element",
            ));
        }
        let index = element.properties.len();
        element.properties.push(property);
        Ok(PropertyIndex(index))
    }

    pub fn add_comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    pub fn add_obj_info(&mut self, text: impl Into<String>) {
        self.obj_infos.push(text.into());
    }

    pub fn element_index(&self, name: &str) -> Option<ElementIndex> {
        self.elements
            .iter()
            .position(|e| e.name == name)
            .map(ElementIndex)
    }

    pub fn element(&self, index: ElementIndex) -> &Element {
        &self.elements[index.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    #[test]
    fn builds_a_minimal_triangle_schema() {
        let mut schema = Schema::new(StorageMode::Ascii);
        let vertex = schema.add_element("vertex", 3);
        schema
            .add_property(vertex, Property::scalar("x", ScalarKind::F32))
            .unwrap();
        schema
            .add_property(vertex, Property::scalar("y", ScalarKind::F32))
            .unwrap();
        schema
            .add_property(vertex, Property::scalar("z", ScalarKind::F32))
            .unwrap();

        let face = schema.add_element("face", 1);
        schema
            .add_property(
                face,
                Property::list("vertex_indices", ScalarKind::U8, ScalarKind::I32),
            )
            .unwrap();

        assert_eq!(schema.elements.len(), 2);
        assert_eq!(schema.element(vertex).properties.len(), 3);
        assert!(schema.element(face).properties[0].is_list());
    }

    #[test]
    fn rejects_duplicate_property_names() {
        let mut schema = Schema::new(StorageMode::Ascii);
        let vertex = schema.add_element("vertex", 1);
        schema
            .add_property(vertex, Property::scalar("x", ScalarKind::F32))
            .unwrap();
        let err = schema
            .add_property(vertex, Property::scalar("x", ScalarKind::F32))
            .unwrap_err();
        assert!(matches!(err, PlyError::SchemaError(_)));
    }

    #[test]
    fn rejects_property_on_unknown_element() {
        let mut schema = Schema::new(StorageMode::Ascii);
        let bogus = ElementIndex(7);
        let err = schema
            .add_property(bogus, Property::scalar("x", ScalarKind::F32))
            .unwrap_err();
        assert!(matches!(err, PlyError::SchemaError(_)));
    }
}
