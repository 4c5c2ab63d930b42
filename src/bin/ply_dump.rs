//! `ply-dump`: a small CLI over the `ply_io` library, built the way the
//! teacher's `eclair-io` binary is — a `structopt::Opt`, `env_logger`
//! initialized first thing in `main`, and the real work delegated to a
//! library function per subcommand (compare `eclair/src/main.rs` and
//! `eclair/src/dump.rs`).

use std::cell::RefCell;
use std::fs::File;
use std::path::PathBuf;
use std::rc::Rc;

use env_logger::{Builder, Env};
use structopt::StructOpt;

use ply_io::{ControlFlow, PlyReader, PlyWriter, PropertyKind, Result, StorageMode};

#[derive(StructOpt)]
#[structopt(
    name = "ply-dump",
    about = "Inspect and convert PLY geometry files.",
    author = "Yan Zaretskiy"
)]
enum Opt {
    /// Print a file's schema: elements, properties, comments, object-info.
    Inspect {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Re-emit a file in a different storage mode.
    Convert {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(parse(from_os_str))]
        output: PathBuf,
        /// One of: ascii, binary-little-endian, binary-big-endian, default
        #[structopt(short, long, default_value = "ascii")]
        mode: String,
    },
}

fn init_logger() {
    let env = Env::default()
        .filter_or("PLY_IO_LOG_LEVEL", "info")
        .write_style_or("PLY_IO_LOG_STYLE", "auto");
    Builder::from_env(env).format_timestamp(None).init();
}

fn parse_mode(token: &str) -> Result<StorageMode> {
    Ok(match token {
        "ascii" => StorageMode::Ascii,
        "binary-little-endian" | "little" => StorageMode::BinaryLittleEndian,
        "binary-big-endian" | "big" => StorageMode::BinaryBigEndian,
        "default" | "native" => StorageMode::native_binary(),
        other => {
            return Err(ply_io::PlyError::UnknownType(other.to_string()));
        }
    })
}

fn inspect(input: PathBuf) -> Result<()> {
    let reader = PlyReader::open_path(&input)?;
    let schema = reader.schema();

    println!("storage mode: {:?}", schema.mode);
    for comment in &schema.comments {
        println!("comment: {comment}");
    }
    for obj_info in &schema.obj_infos {
        println!("obj_info: {obj_info}");
    }
    for element in &schema.elements {
        println!("element {} ({} instances)", element.name, element.count);
        for property in &element.properties {
            match property.kind {
                PropertyKind::Scalar(kind) => {
                    println!("  property {:?} {}", kind, property.name)
                }
                PropertyKind::List {
                    length_kind,
                    value_kind,
                } => println!(
                    "  property list {:?} {:?} {}",
                    length_kind, value_kind, property.name
                ),
            }
        }
    }
    reader.close()
}

/// Read every value of `input` and re-write it to `output` under `mode`,
/// preserving the schema and comment/object-info lines. Works regardless of
/// property shape because the read driver's per-property callback sequence
/// (length-then-entries for lists, §4.7) is exactly the sequence the write
/// driver's cursor expects (§4.8) — so a pass-through callback suffices for
/// both scalars and lists.
fn convert(input: PathBuf, output: PathBuf, mode: StorageMode) -> Result<()> {
    let mut reader = PlyReader::open_path(&input)?;
    let source_schema = reader.schema().clone();

    let mut writer = PlyWriter::create(File::create(&output)?, mode);
    for element in &source_schema.elements {
        let element_index = writer.add_element(element.name.clone(), element.count)?;
        for property in &element.properties {
            writer.add_property(element_index, property.clone())?;
        }
    }
    for comment in &source_schema.comments {
        writer.add_comment(comment.clone())?;
    }
    for obj_info in &source_schema.obj_infos {
        writer.add_obj_info(obj_info.clone())?;
    }
    writer.write_header()?;

    let writer = Rc::new(RefCell::new(writer));
    for element in &source_schema.elements {
        for property in &element.properties {
            let writer = writer.clone();
            reader.set_read_callback(&element.name, &property.name, move |arg| {
                match writer.borrow_mut().write(arg.value()) {
                    Ok(()) => ControlFlow::Continue,
                    Err(_) => ControlFlow::Abort,
                }
            });
        }
    }
    reader.read()?;
    reader.close()?;

    let writer = Rc::try_unwrap(writer)
        .unwrap_or_else(|_| panic!("writer callbacks all dropped by the time read() returns"))
        .into_inner();
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    match Opt::from_args() {
        Opt::Inspect { input } => inspect(input),
        Opt::Convert {
            input,
            output,
            mode,
        } => convert(input, output, parse_mode(&mode)?),
    }
}
