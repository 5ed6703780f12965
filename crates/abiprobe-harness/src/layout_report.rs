//! Layout report: every canonical shape's descriptor with a digest.
//!
//! Two builds agree on the boundary layout exactly when their overall digests
//! match. Per-shape digests localize a disagreement.

use std::fmt::Write;

use abiprobe_core::shape::{Composite, FieldKind, FieldLayout, ShapeLayout, all_layouts, bitfield};
use serde::{Deserialize, Serialize};

use crate::structured_log::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub count: usize,
    /// `signed`, `bits[3..5]`, `nested:SimpleStruct`, ...
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub name: String,
    pub size: usize,
    pub align: usize,
    pub composite: String,
    pub padding_bytes: usize,
    pub trailing_padding: usize,
    pub fields: Vec<FieldRow>,
    /// Descriptor or bit-packing problems; empty for a sound layout.
    pub problems: Vec<String>,
    pub sha256: String,
}

/// Target the report was produced on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub arch: String,
    pub os: String,
    pub pointer_width: usize,
}

impl TargetInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            pointer_width: usize::BITS as usize,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReport {
    pub target: TargetInfo,
    /// SHA-256 over every row digest, in row order.
    pub digest: String,
    pub layouts: Vec<LayoutRow>,
}

fn kind_label(kind: FieldKind) -> String {
    match kind {
        FieldKind::Signed => "signed".into(),
        FieldKind::Unsigned => "unsigned".into(),
        FieldKind::Float => "float".into(),
        FieldKind::Boolean => "boolean".into(),
        FieldKind::PointerSized => "pointer_sized".into(),
        FieldKind::CharBuffer => "char_buffer".into(),
        FieldKind::StringPointer => "string_pointer".into(),
        FieldKind::InterfacePointer => "interface_pointer".into(),
        FieldKind::Nested(name) => format!("nested:{name}"),
        FieldKind::BitField { bit_offset, width } => {
            format!("bits[{bit_offset}..{}]", u16::from(bit_offset) + u16::from(width))
        }
        FieldKind::UnionMember => "union_member".into(),
    }
}

fn field_row(field: &FieldLayout) -> FieldRow {
    FieldRow {
        name: field.name.to_string(),
        offset: field.offset,
        size: field.size,
        count: field.count,
        kind: kind_label(field.kind),
    }
}

/// Canonical text of a descriptor; the digest input.
#[must_use]
pub fn canonical_text(layout: &ShapeLayout) -> String {
    let composite = match layout.composite {
        Composite::Struct => "struct",
        Composite::Union => "union",
    };
    let mut out = format!("{composite} {} size={} align={}\n", layout.name, layout.size, layout.align);
    for f in layout.fields {
        let _ = writeln!(
            out,
            "  {} @{} size={} count={} {}",
            f.name,
            f.offset,
            f.size,
            f.count,
            kind_label(f.kind)
        );
    }
    out
}

#[must_use]
pub fn layout_row(layout: &ShapeLayout) -> LayoutRow {
    let mut problems = layout.validate();
    problems.extend(bitfield::packing_problems(layout));
    LayoutRow {
        name: layout.name.to_string(),
        size: layout.size,
        align: layout.align,
        composite: match layout.composite {
            Composite::Struct => "struct".into(),
            Composite::Union => "union".into(),
        },
        padding_bytes: layout.padding_bytes(),
        trailing_padding: layout.trailing_padding(),
        fields: layout.fields.iter().map(field_row).collect(),
        problems,
        sha256: sha256_hex(canonical_text(layout).as_bytes()),
    }
}

impl LayoutReport {
    /// Report over the core shapes plus the shapes defined at the boundary.
    #[must_use]
    pub fn build() -> Self {
        let mut layouts = all_layouts();
        layouts.extend(abiprobe_abi::struct_abi::boundary_layouts());
        Self::from_layouts(&layouts)
    }

    #[must_use]
    pub fn from_layouts(layouts: &[ShapeLayout]) -> Self {
        let layouts: Vec<LayoutRow> = layouts.iter().map(layout_row).collect();
        let joined: String = layouts.iter().map(|row| row.sha256.as_str()).collect();
        Self {
            target: TargetInfo::current(),
            digest: sha256_hex(joined.as_bytes()),
            layouts,
        }
    }

    /// Rows with at least one problem.
    pub fn invalid(&self) -> impl Iterator<Item = &LayoutRow> {
        self.layouts.iter().filter(|row| !row.problems.is_empty())
    }

    #[must_use]
    pub fn row(&self, name: &str) -> Option<&LayoutRow> {
        self.layouts.iter().find(|row| row.name == name)
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# abiprobe Layout Report\n\n");
        let _ = writeln!(
            out,
            "- Target: {}-{} ({}-bit pointers)",
            self.target.arch, self.target.os, self.target.pointer_width
        );
        let _ = writeln!(out, "- Shapes: {}", self.layouts.len());
        let _ = writeln!(out, "- Digest: `{}`\n", self.digest);
        out.push_str("| Shape | Kind | Size | Align | Padding | Problems | SHA-256 |\n");
        out.push_str("|-------|------|------|-------|---------|----------|---------|\n");
        for row in &self.layouts {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | `{}` |",
                row.name,
                row.composite,
                row.size,
                row.align,
                row.padding_bytes,
                row.problems.len(),
                &row.sha256[..16.min(row.sha256.len())]
            );
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abiprobe_core::Shape;
    use abiprobe_core::shape::plain::{MyValue, SimpleStruct};

    #[test]
    fn every_shape_is_sound() {
        let report = LayoutReport::build();
        let invalid: Vec<_> = report.invalid().map(|r| (&r.name, &r.problems)).collect();
        assert!(invalid.is_empty(), "{invalid:?}");
        assert!(report.row("StructWithInterface").is_some());
    }

    #[test]
    fn names_are_unique() {
        let report = LayoutReport::build();
        let mut names: Vec<&str> = report.layouts.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn my_value_has_interior_padding() {
        let row = layout_row(&MyValue::LAYOUT);
        assert_eq!((row.size, row.align), (16, 8));
        assert_eq!(row.padding_bytes, 4);
        assert_eq!(row.trailing_padding, 0);
        assert_eq!(row.fields[1].offset, 8);
    }

    #[test]
    fn digest_tracks_descriptor_changes() {
        let base = LayoutReport::from_layouts(&[SimpleStruct::LAYOUT]);
        assert_eq!(base.digest, LayoutReport::from_layouts(&[SimpleStruct::LAYOUT]).digest);
        let moved = ShapeLayout {
            align: 8,
            size: 8,
            ..SimpleStruct::LAYOUT
        };
        let changed = LayoutReport::from_layouts(&[moved]);
        assert_ne!(base.digest, changed.digest);
        assert_eq!(base.layouts[0].sha256.len(), 64);
    }

    #[test]
    fn bit_field_labels_show_bit_range() {
        assert_eq!(kind_label(FieldKind::BitField { bit_offset: 1, width: 31 }), "bits[1..32]");
        assert_eq!(kind_label(FieldKind::Nested("SimpleStruct")), "nested:SimpleStruct");
    }

    #[test]
    fn markdown_carries_digest() {
        let report = LayoutReport::build();
        assert!(report.to_markdown().contains(&report.digest));
    }
}
