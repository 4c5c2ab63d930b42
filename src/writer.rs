//! The write driver: a cursor through the schema that turns a flat stream
//! of `f64` values (in declaration order) into header-correct bytes in any
//! of the three storage modes.
//!
//! The teacher has no write path at all (`eclair` only reads Eclipse binary
//! files), so this module is new; it reuses the header-emission half from
//! `header::write_header` and the encode primitives from `encoding.rs`, and
//! is built directly from spec §4.8/§4.9.

use std::io::Write;
use std::path::Path;

use log::{debug, error};

use crate::byteio::ByteWriter;
use crate::encoding::{encode_ascii, encode_binary};
use crate::error::{PlyError, Result};
use crate::header::write_header as emit_header;
use crate::schema::{ElementIndex, Property, PropertyIndex, PropertyKind, Schema, StorageMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SchemaBuilding,
    Writing,
    Closed,
}

/// Tracks an in-progress list property: how many entries remain after the
/// length prefix has been written.
struct ListCursor {
    remaining: usize,
}

/// Default error hook (spec §7), shared with `PlyReader`'s: log at
/// `error!` and also write directly to stderr so the message is visible
/// without a `log` backend installed.
fn default_error_hook(message: &str) {
    error!("{message}");
    eprintln!("ply-io error: {message}");
}

/// Borrow just the `writer` field's buffered writer, panicking only if
/// called after `close()` has taken it — every public method that reaches
/// here first checks `self.state`, so that never happens in practice.
/// Written as a free function (rather than a `&mut self` method) so callers
/// can borrow this field and `self.schema` at the same time.
fn writer_mut<W>(writer: &mut Option<ByteWriter<W>>) -> &mut ByteWriter<W> {
    writer.as_mut().expect("write handle used after close()")
}

/// A PLY write handle. Built up with `add_element`/`add_property`/
/// `add_comment`/`add_obj_info`, then locked by `write_header`, then driven
/// with repeated `write` calls in declaration order.
pub struct PlyWriter<'cb, W> {
    writer: Option<ByteWriter<W>>,
    schema: Schema,
    state: State,
    element_index: usize,
    instance_index: usize,
    property_index: usize,
    list_cursor: Option<ListCursor>,
    values_in_instance: usize,
    error_hook: Option<Box<dyn FnMut(&str) + 'cb>>,
}

impl<'cb, W: Write> PlyWriter<'cb, W> {
    /// Bind to `sink` and start building a schema for `mode`. `mode` may be
    /// `StorageMode::native_binary()` to resolve the create-time `default`
    /// token to the host's endianness.
    pub fn create(sink: W, mode: StorageMode) -> Self {
        PlyWriter {
            writer: Some(ByteWriter::new(sink)),
            schema: Schema::new(mode),
            state: State::SchemaBuilding,
            element_index: 0,
            instance_index: 0,
            property_index: 0,
            list_cursor: None,
            values_in_instance: 0,
            error_hook: None,
        }
    }

    /// Register a hook invoked with a human-readable message whenever a
    /// subsequent `write_header()`/`write()`/`close()` call fails. Replaces
    /// any previously registered hook.
    pub fn set_error_hook(&mut self, hook: impl FnMut(&str) + 'cb) {
        self.error_hook = Some(Box::new(hook));
    }

    fn report(&mut self, err: &PlyError) {
        let message = err.to_string();
        match &mut self.error_hook {
            Some(hook) => hook(&message),
            None => default_error_hook(&message),
        }
    }

    fn require_building(&self) -> Result<()> {
        if self.state != State::SchemaBuilding {
            return Err(PlyError::SchemaLocked);
        }
        Ok(())
    }

    pub fn add_element(&mut self, name: impl Into<crate::schema::Token>, count: usize) -> Result<ElementIndex> {
        self.require_building()?;
        Ok(self.schema.add_element(name, count))
    }

    pub fn add_property(&mut self, element: ElementIndex, property: Property) -> Result<PropertyIndex> {
        self.require_building()?;
        self.schema.add_property(element, property)
    }

    pub fn add_comment(&mut self, text: impl Into<String>) -> Result<()> {
        self.require_building()?;
        self.schema.add_comment(text);
        Ok(())
    }

    pub fn add_obj_info(&mut self, text: impl Into<String>) -> Result<()> {
        self.require_building()?;
        self.schema.add_obj_info(text);
        Ok(())
    }

    /// The schema as built so far (or as frozen, once the header has been
    /// emitted).
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Emit the text header and transition from schema-building to
    /// accepting values. Locks the schema (`SchemaLocked` on further
    /// `add_*` calls). On failure, reports the error through the registered
    /// error hook (or the default one) before returning it.
    pub fn write_header(&mut self) -> Result<()> {
        let result = self.write_header_impl();
        if let Err(ref err) = result {
            self.report(err);
        }
        result
    }

    fn write_header_impl(&mut self) -> Result<()> {
        self.require_building()?;
        emit_header(writer_mut(&mut self.writer), &self.schema)?;
        self.state = State::Writing;
        self.element_index = 0;
        self.instance_index = 0;
        self.property_index = 0;
        self.values_in_instance = 0;
        self.skip_empty_elements();
        debug!(
            "wrote header: {} elements in {:?}",
            self.schema.elements.len(),
            self.schema.mode
        );
        Ok(())
    }

    /// Elements with a declared instance count of 0 never receive a
    /// `write()` call; skip straight past them so the cursor doesn't stall.
    fn skip_empty_elements(&mut self) {
        while self.element_index < self.schema.elements.len()
            && self.schema.elements[self.element_index].count == 0
        {
            self.element_index += 1;
        }
    }

    fn current_property(&self) -> Option<(&Property, usize)> {
        let element = self.schema.elements.get(self.element_index)?;
        element
            .properties
            .get(self.property_index)
            .map(|p| (p, element.properties.len()))
    }

    /// Write the next value in declaration order. Scalars advance the
    /// cursor one property at a time; list properties expect the length
    /// first (spec §4.8), then that many entries. On failure, reports the
    /// error through the registered error hook (or the default one) before
    /// returning it.
    pub fn write(&mut self, value: f64) -> Result<()> {
        let result = self.write_impl(value);
        if let Err(ref err) = result {
            self.report(err);
        }
        result
    }

    fn write_impl(&mut self, value: f64) -> Result<()> {
        if self.state != State::Writing {
            return Err(PlyError::InvalidState(
                "write() called before write_header() or after close()",
            ));
        }

        let mode = self
            .schema
            .mode
            .expect("a writer's schema always carries its storage mode");
        let big_endian = mode == StorageMode::BinaryBigEndian;

        let Some((property, property_count)) = self.current_property() else {
            return Err(PlyError::TooManyValues);
        };

        if mode == StorageMode::Ascii && self.values_in_instance > 0 {
            writer_mut(&mut self.writer).put_bytes(b" ")?;
        }

        match property.kind {
            PropertyKind::Scalar(kind) => {
                self.encode_one(mode, big_endian, kind, value)?;
                self.values_in_instance += 1;
                self.advance_property(property_count)?;
            }
            PropertyKind::List {
                length_kind,
                value_kind,
            } => match &mut self.list_cursor {
                None => {
                    let length = value.round().max(0.0) as usize;
                    self.encode_one(mode, big_endian, length_kind, length as f64)?;
                    self.values_in_instance += 1;
                    if length == 0 {
                        self.advance_property(property_count)?;
                    } else {
                        self.list_cursor = Some(ListCursor { remaining: length });
                    }
                }
                Some(cursor) => {
                    self.encode_one(mode, big_endian, value_kind, value)?;
                    self.values_in_instance += 1;
                    cursor.remaining -= 1;
                    if cursor.remaining == 0 {
                        self.list_cursor = None;
                        self.advance_property(property_count)?;
                    }
                }
            },
        }

        Ok(())
    }

    fn encode_one(
        &mut self,
        mode: StorageMode,
        big_endian: bool,
        kind: crate::types::ScalarKind,
        value: f64,
    ) -> Result<()> {
        if mode == StorageMode::Ascii {
            writer_mut(&mut self.writer).put_word(&encode_ascii(value, kind))
        } else {
            encode_binary(writer_mut(&mut self.writer), big_endian, kind, value)
        }
    }

    fn advance_property(&mut self, property_count: usize) -> Result<()> {
        self.property_index += 1;
        if self.property_index < property_count {
            return Ok(());
        }
        self.property_index = 0;
        self.values_in_instance = 0;
        if self.schema.mode == Some(StorageMode::Ascii) {
            writer_mut(&mut self.writer).put_eol()?;
        }
        self.instance_index += 1;
        if self.instance_index < self.schema.elements[self.element_index].count {
            return Ok(());
        }
        self.instance_index = 0;
        self.element_index += 1;
        self.skip_empty_elements();
        Ok(())
    }

    /// Whether every declared value has been written.
    fn is_complete(&self) -> bool {
        self.element_index >= self.schema.elements.len()
    }

    /// Flush and release the handle, returning the underlying sink. Fails
    /// with `Underrun` if fewer values were written than the schema
    /// declares; the sink is still flushed first. On failure, reports the
    /// error through the registered error hook (or the default one) before
    /// returning it.
    pub fn close(mut self) -> Result<W> {
        let result = self.close_impl();
        if let Err(ref err) = result {
            self.report(err);
        }
        result
    }

    fn close_impl(&mut self) -> Result<W> {
        let underrun = self.state == State::Writing && !self.is_complete();
        self.state = State::Closed;
        let inner = self
            .writer
            .take()
            .expect("write handle used after close()")
            .into_inner()?;
        if underrun {
            return Err(PlyError::Underrun);
        }
        Ok(inner)
    }
}

impl<'cb, W: Write> Drop for PlyWriter<'cb, W> {
    /// Best-effort flush if the handle is dropped without an explicit
    /// `close()`; errors here have nowhere to go, so they're swallowed.
    /// `close()` still leaves `self.writer` as `None`, so a drop after a
    /// successful close is a no-op.
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush_buffer();
        }
    }
}

impl<'cb> PlyWriter<'cb, std::fs::File> {
    /// Create a PLY file at `path`.
    pub fn create_path(path: impl AsRef<Path>, mode: StorageMode) -> Result<Self> {
        Ok(Self::create(std::fs::File::create(path)?, mode))
    }
}
