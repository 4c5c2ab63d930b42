//! Header serialization: the schema model back out as the text preamble.
//! One method per header line kind, in the spirit of the reference `ply-rs`
//! writer's `write_line_*` methods, but expressed as free functions over a
//! `ByteWriter` using `?` rather than `try!`.

use std::io::Write;

use crate::byteio::ByteWriter;
use crate::error::{PlyError, Result};
use crate::schema::{PropertyKind, Schema};
use crate::types::canonical_spelling;

pub fn write_header<W: Write>(writer: &mut ByteWriter<W>, schema: &Schema) -> Result<()> {
    let mode = schema.mode.ok_or(PlyError::SchemaError(
        "write_header: schema has no storage mode set",
    ))?;

    write_line(writer, "ply")?;
    write_line(writer, &format!("format {} 1.0", mode.header_token()))?;

    for comment in &schema.comments {
        write_line(writer, &format!("comment {comment}"))?;
    }
    for obj_info in &schema.obj_infos {
        write_line(writer, &format!("obj_info {obj_info}"))?;
    }

    for element in &schema.elements {
        write_line(writer, &format!("element {} {}", element.name, element.count))?;
        for property in &element.properties {
            match property.kind {
                PropertyKind::Scalar(kind) => {
                    write_line(
                        writer,
                        &format!("property {} {}", canonical_spelling(kind), property.name),
                    )?;
                }
                PropertyKind::List {
                    length_kind,
                    value_kind,
                } => {
                    write_line(
                        writer,
                        &format!(
                            "property list {} {} {}",
                            canonical_spelling(length_kind),
                            canonical_spelling(value_kind),
                            property.name
                        ),
                    )?;
                }
            }
        }
    }

    write_line(writer, "end_header")
}

fn write_line<W: Write>(writer: &mut ByteWriter<W>, line: &str) -> Result<()> {
    writer.put_word(line)?;
    writer.put_eol()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Property, StorageMode};
    use crate::types::ScalarKind;
    use std::io::Cursor;

    #[test]
    fn emits_minimal_triangle_header() {
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

        let mut writer = ByteWriter::new(Cursor::new(Vec::new()));
        write_header(&mut writer, &schema).unwrap();
        let bytes = writer.into_inner().unwrap().into_inner();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "ply\n\
             format ascii 1.0\n\
             element vertex 3\n\
             property float x\n\
             property float y\n\
             property float z\n\
             element face 1\n\
             property list uchar int vertex_indices\n\
             end_header\n"
        );
    }

    #[test]
    fn schema_with_no_storage_mode_is_a_schema_error_not_a_panic() {
        // A `Schema` built directly (e.g. `Schema::default()`) rather than
        // through `PlyWriter::create` may have no mode set; write_header
        // must report that as an error, not panic.
        let schema = Schema::default();
        let mut writer = ByteWriter::new(Cursor::new(Vec::new()));
        let err = write_header(&mut writer, &schema).unwrap_err();
        assert!(matches!(err, PlyError::SchemaError(_)));
    }
}
