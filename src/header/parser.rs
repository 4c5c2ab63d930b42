//! Header tokenizer and grammar. Line-oriented: each header line is pulled
//! whole off the buffered reader (`ByteReader::read_header_line`), then
//! split into whitespace-separated tokens the way the teacher's
//! `binary_parsing` module splits a fixed-width binary record into its
//! fields — here the fields are variable-width words instead of byte runs.

use std::io::Read;

use log::debug;

use crate::byteio::{ByteReader, LineEnding};
use crate::error::{PlyError, Result};
use crate::schema::{Property, Schema, StorageMode};
use crate::types;

pub fn parse_header<R: Read>(reader: &mut ByteReader<R>) -> Result<Schema> {
    let (magic, established) = reader.read_header_line()?;
    if magic != "ply" {
        return Err(PlyError::unknown_keyword(magic));
    }

    let format_line = read_line_checked(reader, established)?;
    let mode = parse_format_line(&format_line)?;
    let mut schema = Schema::new(mode);

    let mut current_element: Option<crate::schema::ElementIndex> = None;

    loop {
        let line = read_line_checked(reader, established)?;
        let trimmed = line.trim_start();
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or("");

        match keyword {
            "end_header" => break,
            "comment" => schema.add_comment(rest_of_line(trimmed, keyword)),
            "obj_info" => schema.add_obj_info(rest_of_line(trimmed, keyword)),
            "element" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                let count_tok = tokens
                    .next()
                    .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                let count: usize = count_tok.parse().map_err(|_| PlyError::BadInteger {
                    token: count_tok.to_string(),
                })?;
                current_element = Some(schema.add_element(name, count));
            }
            "property" => {
                let element = current_element.ok_or(PlyError::OrphanProperty)?;
                let type_tok = tokens
                    .next()
                    .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                if type_tok == "list" {
                    let length_tok = tokens
                        .next()
                        .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                    let value_tok = tokens
                        .next()
                        .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                    let name = tokens
                        .next()
                        .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                    let length_kind = types::resolve(length_tok)?;
                    let value_kind = types::resolve(value_tok)?;
                    schema.add_property(element, Property::list(name, length_kind, value_kind))?;
                } else {
                    let kind = types::resolve(type_tok)?;
                    let name = tokens
                        .next()
                        .ok_or_else(|| PlyError::unknown_keyword(line.clone()))?;
                    schema.add_property(element, Property::scalar(name, kind))?;
                }
            }
            other => return Err(PlyError::unknown_keyword(other)),
        }
    }

    debug!(
        "parsed header: {} elements, {} comments, {} obj_info lines",
        schema.elements.len(),
        schema.comments.len(),
        schema.obj_infos.len()
    );
    Ok(schema)
}

fn parse_format_line(line: &str) -> Result<StorageMode> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first().copied() != Some("format") {
        return Err(PlyError::unknown_keyword(
            tokens.first().copied().unwrap_or("").to_string(),
        ));
    }
    if tokens.len() != 3 {
        return Err(PlyError::UnsupportedVersion(line.to_string()));
    }
    let mode = match tokens[1] {
        "ascii" => StorageMode::Ascii,
        "binary_little_endian" => StorageMode::BinaryLittleEndian,
        "binary_big_endian" => StorageMode::BinaryBigEndian,
        other => return Err(PlyError::UnsupportedVersion(other.to_string())),
    };
    if tokens[2] != "1.0" {
        return Err(PlyError::UnsupportedVersion(tokens[2].to_string()));
    }
    Ok(mode)
}

/// Everything after `keyword` and its single separating space, preserving
/// any further internal whitespace verbatim (comment/obj_info text is
/// free-form).
fn rest_of_line(trimmed: &str, keyword: &str) -> String {
    let after = &trimmed[keyword.len()..];
    after.strip_prefix(' ').unwrap_or(after).to_string()
}

fn read_line_checked<R: Read>(reader: &mut ByteReader<R>, expected: LineEnding) -> Result<String> {
    let (text, ending) = reader.read_header_line()?;
    if ending != expected {
        return Err(PlyError::bad_line_terminator());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Schema> {
        let mut reader = ByteReader::new(Cursor::new(text.as_bytes().to_vec()));
        parse_header(&mut reader)
    }

    #[test]
    fn parses_minimal_triangle_header() {
        let schema = parse(
            "ply\n\
             format ascii 1.0\n\
             comment made by a test\n\
             element vertex 3\n\
             property float x\n\
             property float y\n\
             property float z\n\
             element face 1\n\
             property list uchar int vertex_indices\n\
             end_header\n",
        )
        .unwrap();

        assert_eq!(schema.mode, Some(StorageMode::Ascii));
        assert_eq!(schema.comments, vec!["made by a test".to_string()]);
        assert_eq!(schema.elements.len(), 2);
        assert_eq!(schema.elements[0].name, "vertex");
        assert_eq!(schema.elements[0].count, 3);
        assert_eq!(schema.elements[0].properties.len(), 3);
        assert_eq!(schema.elements[1].name, "face");
        assert!(schema.elements[1].properties[0].is_list());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = parse("ply\nformat ascii 2.0\nend_header\n").unwrap_err();
        assert!(matches!(err, PlyError::UnsupportedVersion(_)));
    }

    #[test]
    fn rejects_orphan_property() {
        let err = parse("ply\nformat ascii 1.0\nproperty float x\nend_header\n").unwrap_err();
        assert!(matches!(err, PlyError::OrphanProperty));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = parse(
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty potato x\nend_header\n",
        )
        .unwrap_err();
        assert!(matches!(err, PlyError::UnknownType(_)));
    }

    #[test]
    fn rejects_unknown_keyword() {
        let err = parse("ply\nformat ascii 1.0\nbogus stuff\nend_header\n").unwrap_err();
        assert!(matches!(err, PlyError::UnknownKeyword { .. }));
    }

    #[test]
    fn crlf_file_parses_and_mixed_terminators_are_rejected() {
        let schema = parse("ply\r\nformat ascii 1.0\r\nelement vertex 0\r\nproperty float x\r\nend_header\r\n").unwrap();
        assert_eq!(schema.elements[0].count, 0);

        let mut reader = ByteReader::new(Cursor::new(
            b"ply\nformat ascii 1.0\r\nend_header\n".to_vec(),
        ));
        let err = parse_header(&mut reader).unwrap_err();
        match err {
            PlyError::UnknownKeyword {
                bad_line_terminator,
                ..
            } => assert!(bad_line_terminator),
            other => panic!("expected a line-terminator mismatch, got {other:?}"),
        }
    }
}
