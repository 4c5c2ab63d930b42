//! The scalar type registry: the seventeen accepted PLY type spellings and
//! the eight canonical numeric kinds they resolve to.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{PlyError, Result};

/// One of the eight canonical numeric kinds a PLY scalar can hold on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarKind {
    /// On-disk byte width of a single value of this kind.
    pub fn width(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::F64 => 8,
        }
    }

    /// Truncate-then-clamp (integers) or round-to-nearest (floats) `value`
    /// into the representable range of this kind, as an `f64` that is
    /// already exactly representable in the target kind.
    pub fn clamp(self, value: f64) -> f64 {
        use ScalarKind::*;
        match self {
            I8 => trunc_clamp(value, i8::MIN as f64, i8::MAX as f64),
            U8 => trunc_clamp(value, u8::MIN as f64, u8::MAX as f64),
            I16 => trunc_clamp(value, i16::MIN as f64, i16::MAX as f64),
            U16 => trunc_clamp(value, u16::MIN as f64, u16::MAX as f64),
            I32 => trunc_clamp(value, i32::MIN as f64, i32::MAX as f64),
            U32 => trunc_clamp(value, u32::MIN as f64, u32::MAX as f64),
            // f32 rounding happens at encode time (the cast does it); here we
            // only need to report the value that a round-trip through f32
            // would produce.
            F32 => value as f32 as f64,
            F64 => value,
        }
    }
}

fn trunc_clamp(value: f64, min: f64, max: f64) -> f64 {
    let truncated = value.trunc();
    if truncated.is_nan() {
        0.0
    } else if truncated < min {
        min
    } else if truncated > max {
        max
    } else {
        truncated
    }
}

/// The seventeen text spellings accepted in a `property` header line, mapped
/// to their canonical kind. Built once; `resolve` is on the header-parsing
/// hot path, so it's worth not rebuilding this table per call.
static SPELLINGS: Lazy<HashMap<&'static str, ScalarKind>> = Lazy::new(|| {
    use ScalarKind::*;
    HashMap::from([
        ("char", I8),
        ("int8", I8),
        ("uchar", U8),
        ("uint8", U8),
        ("short", I16),
        ("int16", I16),
        ("ushort", U16),
        ("uint16", U16),
        ("int", I32),
        ("int32", I32),
        ("uint", U32),
        ("uint32", U32),
        ("float", F32),
        ("float32", F32),
        ("double", F64),
        ("float64", F64),
    ])
});

/// Resolve a header type spelling (e.g. `"uchar"`, `"float64"`) to its
/// canonical kind. `"list"` is not a kind and is handled by the header
/// parser separately, not here.
pub fn resolve(spelling: &str) -> Result<ScalarKind> {
    SPELLINGS
        .get(spelling)
        .copied()
        .ok_or_else(|| PlyError::UnknownType(spelling.to_string()))
}

/// The spelling this crate emits for `kind` on write. Any of the spellings
/// `resolve` accepts would round-trip; these are the conventional short
/// forms used by the reference `.ply` sample files.
pub fn canonical_spelling(kind: ScalarKind) -> &'static str {
    use ScalarKind::*;
    match kind {
        I8 => "char",
        U8 => "uchar",
        I16 => "short",
        U16 => "ushort",
        I32 => "int",
        U32 => "uint",
        F32 => "float",
        F64 => "double",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_seventeen_spellings() {
        for s in [
            "char", "int8", "uchar", "uint8", "short", "int16", "ushort", "uint16", "int",
            "int32", "uint", "uint32", "float", "float32", "double", "float64",
        ] {
            assert!(resolve(s).is_ok(), "{s} should resolve");
        }
        assert!(resolve("list").is_err());
        assert!(resolve("bogus").is_err());
    }

    #[test]
    fn widths_are_correct() {
        assert_eq!(ScalarKind::I8.width(), 1);
        assert_eq!(ScalarKind::U8.width(), 1);
        assert_eq!(ScalarKind::I16.width(), 2);
        assert_eq!(ScalarKind::U16.width(), 2);
        assert_eq!(ScalarKind::I32.width(), 4);
        assert_eq!(ScalarKind::U32.width(), 4);
        assert_eq!(ScalarKind::F32.width(), 4);
        assert_eq!(ScalarKind::F64.width(), 8);
    }

    #[test]
    fn canonical_spellings_resolve_back_to_the_same_kind() {
        for kind in [
            ScalarKind::I8,
            ScalarKind::U8,
            ScalarKind::I16,
            ScalarKind::U16,
            ScalarKind::I32,
            ScalarKind::U32,
            ScalarKind::F32,
            ScalarKind::F64,
        ] {
            assert_eq!(resolve(canonical_spelling(kind)).unwrap(), kind);
        }
    }

    #[test]
    fn clamping_matches_scenario_5() {
        assert_eq!(ScalarKind::U8.clamp(300.0), 255.0);
        assert_eq!(ScalarKind::I16.clamp(-1.5), -1.0);
        assert_eq!(ScalarKind::F32.clamp(1e40), f32::INFINITY as f64);
    }
}
