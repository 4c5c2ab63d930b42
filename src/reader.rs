//! The read driver: once the header is parsed and callbacks are registered,
//! walks element instances in declared order and, per property, decodes one
//! value (scalar) or a length followed by that many entries (list),
//! dispatching each decoded value through the registration table.
//!
//! Grounded on `eclair/src/binary.rs`'s `BinFile::for_each_kw` — a generic
//! `FnMut` callback loop that threads a `Result` through to let the closure
//! cancel the walk — generalized here to a per-(element, property)
//! dispatch table (spec §9) instead of per-keyword dispatch, since a PLY
//! reader serves many properties per element rather than one callback per
//! record type.

use std::io::Read;
use std::path::Path;

use log::{debug, error, warn};

use crate::arg::{ControlFlow, ReadArg};
use crate::byteio::ByteReader;
use crate::encoding::{decode_ascii, decode_binary};
use crate::error::{PlyError, Result};
use crate::header::parse_header;
use crate::schema::{Comment, Element, ObjInfo, PropertyKind, Schema, StorageMode};

/// Where a handle is in its open/read/closed lifecycle. An attempt to use a
/// handle outside this ordering fails with `InvalidState` (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingCallbacks,
    Done,
    Closed,
}

type Callback<'cb> = Box<dyn FnMut(ReadArg) -> ControlFlow + 'cb>;
type ErrorHook<'cb> = Box<dyn FnMut(&str) + 'cb>;

/// Default error hook (spec §7): log at `error!`, and also write directly
/// to stderr so the message is visible even if the embedding application
/// never installed a `log` backend.
fn default_error_hook(message: &str) {
    error!("{message}");
    eprintln!("ply-io error: {message}");
}

/// A PLY read handle. Bound to a source, the header already parsed; accepts
/// callback registrations and then drives a single read pass.
///
/// Two-level `Vec<Vec<Option<_>>>` dispatch table indexed by
/// `(element_index, property_index)`, resolved once at `set_read_callback`
/// time so the driver's inner loop never does a hash lookup or name
/// comparison (spec §9, §4.7).
pub struct PlyReader<'cb, R> {
    reader: ByteReader<R>,
    schema: Schema,
    callbacks: Vec<Vec<Option<Callback<'cb>>>>,
    error_hook: Option<ErrorHook<'cb>>,
    state: State,
}

impl<'cb, R: Read> PlyReader<'cb, R> {
    /// Bind to `source` and parse the header. Enters the "awaiting
    /// callbacks" state (spec §4.9); no element data is consumed yet.
    pub fn open(source: R) -> Result<Self> {
        let mut reader = ByteReader::new(source);
        let schema = parse_header(&mut reader)?;
        let callbacks = schema
            .elements
            .iter()
            .map(|element| (0..element.properties.len()).map(|_| None).collect())
            .collect();
        Ok(PlyReader {
            reader,
            schema,
            callbacks,
            error_hook: None,
            state: State::AwaitingCallbacks,
        })
    }

    /// Register a hook invoked with a human-readable message whenever a
    /// subsequent `read()` fails. Replaces any previously registered hook.
    /// With no hook registered, failures are reported via the default hook
    /// (`log::error!` plus a direct `stderr` write).
    pub fn set_error_hook(&mut self, hook: impl FnMut(&str) + 'cb) {
        self.error_hook = Some(Box::new(hook));
    }

    /// The parsed schema: elements, properties, comments, object-info lines,
    /// and storage mode.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Declared elements, in header order.
    pub fn elements(&self) -> &[Element] {
        &self.schema.elements
    }

    /// Comment lines, in header order.
    pub fn comments(&self) -> &[Comment] {
        &self.schema.comments
    }

    /// Object-info lines, in header order.
    pub fn obj_infos(&self) -> &[ObjInfo] {
        &self.schema.obj_infos
    }

    /// Register a callback for `(element_name, property_name)`. Returns the
    /// element's declared instance count, or 0 if the pair doesn't exist —
    /// per spec this is not an error. Re-registering the same pair silently
    /// replaces the previous callback (spec §9 Open Question).
    pub fn set_read_callback(
        &mut self,
        element_name: &str,
        property_name: &str,
        callback: impl FnMut(ReadArg) -> ControlFlow + 'cb,
    ) -> usize {
        let Some(element_index) = self.schema.element_index(element_name) else {
            warn!("set_read_callback: unknown element {element_name:?}");
            return 0;
        };
        let element = self.schema.element(element_index);
        let Some(property_index) = element.property_index(property_name) else {
            warn!(
                "set_read_callback: unknown property {element_name}.{property_name}"
            );
            return 0;
        };
        let count = element.count;
        self.callbacks[element_index.0][property_index] = Some(Box::new(callback));
        count
    }

    /// Run the read driver exactly once: walk every element instance in
    /// declared order, decoding and dispatching each property's value(s).
    /// Fails with `InvalidState` if called more than once, and with
    /// `Aborted` if a callback requests cancellation. On failure, reports
    /// the error through the registered error hook (or the default one)
    /// before returning it. Per spec §7, any failure poisons the handle:
    /// every error path out of `read_impl` leaves `state` at `Done`, so a
    /// second `read()` call always fails with `InvalidState` rather than
    /// resuming against a partially-consumed reader.
    pub fn read(&mut self) -> Result<()> {
        let result = self.read_impl();
        if let Err(ref err) = result {
            self.state = State::Done;
            let message = err.to_string();
            match &mut self.error_hook {
                Some(hook) => hook(&message),
                None => default_error_hook(&message),
            }
        }
        result
    }

    fn read_impl(&mut self) -> Result<()> {
        if self.state != State::AwaitingCallbacks {
            return Err(PlyError::InvalidState(
                "read() called outside the awaiting-callbacks state",
            ));
        }

        let mode = self
            .schema
            .mode
            .expect("a parsed header always records a storage mode");
        let big_endian = mode == StorageMode::BinaryBigEndian;

        for element_index in 0..self.schema.elements.len() {
            let element_name = self.schema.elements[element_index].name.clone();
            let count = self.schema.elements[element_index].count;
            let property_count = self.schema.elements[element_index].properties.len();

            for instance_index in 0..count {
                for property_index in 0..property_count {
                    let property = self.schema.elements[element_index].properties[property_index].clone();
                    let key = (element_index, property_index);

                    match property.kind {
                        PropertyKind::Scalar(kind) => {
                            let value = self.decode_one(mode, big_endian, kind)?;
                            let flow = self.dispatch(
                                key,
                                &element_name,
                                element_index,
                                instance_index,
                                &property.name,
                                property_index,
                                1,
                                0,
                                value,
                            );
                            if flow.is_abort() {
                                return Err(PlyError::Aborted);
                            }
                        }
                        PropertyKind::List {
                            length_kind,
                            value_kind,
                        } => {
                            let length_value = self.decode_one(mode, big_endian, length_kind)?;
                            if length_value < 0.0 {
                                return Err(PlyError::BadInteger {
                                    token: length_value.to_string(),
                                });
                            }
                            let length = length_value as usize;

                            let flow = self.dispatch(
                                key,
                                &element_name,
                                element_index,
                                instance_index,
                                &property.name,
                                property_index,
                                length,
                                -1,
                                length_value,
                            );
                            if flow.is_abort() {
                                return Err(PlyError::Aborted);
                            }

                            for entry_index in 0..length {
                                let value = self.decode_one(mode, big_endian, value_kind)?;
                                let flow = self.dispatch(
                                    key,
                                    &element_name,
                                    element_index,
                                    instance_index,
                                    &property.name,
                                    property_index,
                                    length,
                                    entry_index as isize,
                                    value,
                                );
                                if flow.is_abort() {
                                    return Err(PlyError::Aborted);
                                }
                            }
                        }
                    }
                }
            }
        }

        self.state = State::Done;
        debug!("read pass complete");
        Ok(())
    }

    fn decode_one(
        &mut self,
        mode: StorageMode,
        big_endian: bool,
        kind: crate::types::ScalarKind,
    ) -> Result<f64> {
        if mode == StorageMode::Ascii {
            let word = self.reader.read_word()?;
            decode_ascii(&word, kind)
        } else {
            decode_binary(&mut self.reader, big_endian, kind)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        key: (usize, usize),
        element_name: &str,
        element_index: usize,
        instance_index: usize,
        property_name: &str,
        property_index: usize,
        length: usize,
        value_index: isize,
        value: f64,
    ) -> ControlFlow {
        match self.callbacks[key.0][key.1].as_mut() {
            Some(callback) => callback(ReadArg::new(
                element_name,
                element_index,
                instance_index,
                property_name,
                property_index,
                length,
                value_index,
                value,
            )),
            None => ControlFlow::Continue,
        }
    }

    /// Release resources. Idempotent only in the sense that calling it more
    /// than once is harmless; there's no buffered output to flush on a
    /// reader.
    pub fn close(mut self) -> Result<()> {
        self.state = State::Closed;
        Ok(())
    }
}

impl<'cb> PlyReader<'cb, std::fs::File> {
    /// Open a PLY file by path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(std::fs::File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::ControlFlow;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    const TRIANGLE_ASCII: &str = "ply\n\
        format ascii 1.0\n\
        element vertex 3\n\
        property float x\n\
        property float y\n\
        property float z\n\
        element face 1\n\
        property list uchar int vertex_indices\n\
        end_header\n\
        -1 0 0\n\
        0 1 0\n\
        1 0 0\n\
        3 0 1 2\n";

    #[test]
    fn scenario_1_minimal_triangle_callback_sequence() {
        let mut reader = PlyReader::open(Cursor::new(TRIANGLE_ASCII.as_bytes().to_vec())).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        for prop in ["x", "y", "z"] {
            let log = log.clone();
            reader.set_read_callback("vertex", prop, move |arg| {
                log.borrow_mut()
                    .push((prop.to_string(), arg.instance_index(), arg.value_index(), arg.value()));
                ControlFlow::Continue
            });
        }
        {
            let log = log.clone();
            reader.set_read_callback("face", "vertex_indices", move |arg| {
                log.borrow_mut().push((
                    "vertex_indices".to_string(),
                    arg.instance_index(),
                    arg.value_index(),
                    arg.value(),
                ));
                ControlFlow::Continue
            });
        }

        reader.read().unwrap();
        let entries = log.borrow();
        assert_eq!(entries[0], ("x".to_string(), 0, 0, -1.0));
        assert_eq!(entries[1], ("y".to_string(), 0, 0, 0.0));
        assert_eq!(entries[2], ("z".to_string(), 0, 0, 0.0));
        assert_eq!(entries[9], ("vertex_indices".to_string(), 0, -1, 3.0));
        assert_eq!(entries[10], ("vertex_indices".to_string(), 0, 0, 0.0));
        assert_eq!(entries[11], ("vertex_indices".to_string(), 0, 1, 1.0));
        assert_eq!(entries[12], ("vertex_indices".to_string(), 0, 2, 2.0));
    }

    #[test]
    fn scenario_2_big_endian_binary_matches_ascii_values() {
        // Build the same triangle in binary_big_endian, then confirm reading
        // it produces the same values as the ascii version.
        use crate::schema::{Property, StorageMode};
        use crate::types::ScalarKind;
        use crate::writer::PlyWriter;

        let mut writer = PlyWriter::create(Vec::new(), StorageMode::BinaryBigEndian);
        let vertex = writer.add_element("vertex", 3).unwrap();
        writer.add_property(vertex, Property::scalar("x", ScalarKind::F32)).unwrap();
        writer.add_property(vertex, Property::scalar("y", ScalarKind::F32)).unwrap();
        writer.add_property(vertex, Property::scalar("z", ScalarKind::F32)).unwrap();
        let face = writer.add_element("face", 1).unwrap();
        writer
            .add_property(face, Property::list("vertex_indices", ScalarKind::U8, ScalarKind::I32))
            .unwrap();

        writer.write_header().unwrap();
        for v in [-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0] {
            writer.write(v).unwrap();
        }
        for v in [3.0, 0.0, 1.0, 2.0] {
            writer.write(v).unwrap();
        }
        let bytes = writer.close().unwrap();

        let mut reader = PlyReader::open(Cursor::new(bytes)).unwrap();
        let values = Rc::new(RefCell::new(Vec::new()));
        for prop in ["x", "y", "z"] {
            let values = values.clone();
            reader.set_read_callback("vertex", prop, move |arg| {
                values.borrow_mut().push(arg.value());
                ControlFlow::Continue
            });
        }
        reader.read().unwrap();
        assert_eq!(*values.borrow(), vec![-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn scenario_3_empty_element_fires_no_callbacks_and_returns_zero() {
        let text = "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nend_header\n";
        let mut reader = PlyReader::open(Cursor::new(text.as_bytes().to_vec())).unwrap();
        let fired = Rc::new(RefCell::new(0));
        let fired2 = fired.clone();
        let count = reader.set_read_callback("vertex", "x", move |_| {
            *fired2.borrow_mut() += 1;
            ControlFlow::Continue
        });
        assert_eq!(count, 0);
        reader.read().unwrap();
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn unknown_element_or_property_returns_zero_without_erroring() {
        let mut reader = PlyReader::open(Cursor::new(TRIANGLE_ASCII.as_bytes().to_vec())).unwrap();
        assert_eq!(
            reader.set_read_callback("nope", "x", |_| ControlFlow::Continue),
            0
        );
        assert_eq!(
            reader.set_read_callback("vertex", "nope", |_| ControlFlow::Continue),
            0
        );
    }

    #[test]
    fn scenario_4_list_of_zero_entries() {
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0\n";
        let mut reader = PlyReader::open(Cursor::new(text.as_bytes().to_vec())).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        reader.set_read_callback("face", "vertex_indices", move |arg| {
            log2.borrow_mut().push((arg.value_index(), arg.length(), arg.value()));
            ControlFlow::Continue
        });
        reader.read().unwrap();
        assert_eq!(*log.borrow(), vec![(-1, 0, 0.0)]);
    }

    #[test]
    fn scenario_6_abort_halts_read_and_poisons_the_handle() {
        let mut reader = PlyReader::open(Cursor::new(TRIANGLE_ASCII.as_bytes().to_vec())).unwrap();
        let seen = Rc::new(RefCell::new(0));
        let seen2 = seen.clone();
        reader.set_read_callback("vertex", "x", move |_| {
            *seen2.borrow_mut() += 1;
            if *seen2.borrow() == 2 {
                ControlFlow::Abort
            } else {
                ControlFlow::Continue
            }
        });
        let err = reader.read().unwrap_err();
        assert!(matches!(err, PlyError::Aborted));
        assert_eq!(*seen.borrow(), 2);

        let err = reader.read().unwrap_err();
        assert!(matches!(err, PlyError::InvalidState(_)));
    }

    #[test]
    fn negative_list_length_is_rejected() {
        // uchar length-kind can't go negative on disk, so use a binary short
        // (signed) length kind to exercise the negative path.
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list short int vertex_indices\nend_header\n-1\n";
        let mut reader = PlyReader::open(Cursor::new(text.as_bytes().to_vec())).unwrap();
        reader.set_read_callback("face", "vertex_indices", |_| ControlFlow::Continue);
        let err = reader.read().unwrap_err();
        assert!(matches!(err, PlyError::BadInteger { .. }));
    }

    #[test]
    fn non_abort_failure_also_poisons_the_handle() {
        // Same malformed negative-length body as above, but this time check
        // that the *non-abort* error path poisons the handle too: a second
        // read() must fail with InvalidState instead of restarting the
        // element walk against the already partially-consumed reader.
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list short int vertex_indices\nend_header\n-1\n";
        let mut reader = PlyReader::open(Cursor::new(text.as_bytes().to_vec())).unwrap();
        reader.set_read_callback("face", "vertex_indices", |_| ControlFlow::Continue);

        let err = reader.read().unwrap_err();
        assert!(matches!(err, PlyError::BadInteger { .. }));

        let err = reader.read().unwrap_err();
        assert!(matches!(err, PlyError::InvalidState(_)));
    }
}
