//! Tree-string rendering, required by `spec.md` §4.6 ("out of core scope
//! but must be available") and made concrete by `SPEC_FULL.md` §4.6.

use crate::ast::SyntaxTreeNode;

/// Which glyph set to draw branches with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyphs {
    Unicode,
    Ascii,
}

struct GlyphSet {
    tee: &'static str,
    elbow: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

const UNICODE: GlyphSet = GlyphSet {
    tee: "├── ",
    elbow: "└── ",
    pipe: "│   ",
    blank: "    ",
};

const ASCII: GlyphSet = GlyphSet {
    tee: "|-- ",
    elbow: "`-- ",
    pipe: "|   ",
    blank: "    ",
};

pub(crate) fn render(root: &SyntaxTreeNode, glyphs: Glyphs) -> String {
    let set = match glyphs {
        Glyphs::Unicode => &UNICODE,
        Glyphs::Ascii => &ASCII,
    };
    let mut out = String::new();
    write_label(&mut out, root);
    out.push('\n');
    write_children(&mut out, root, "", set);
    out
}

fn write_label(out: &mut String, node: &SyntaxTreeNode) {
    match &node.name {
        Some(name) => out.push_str(&format!("{name} {:?}", node.substring)),
        None => out.push_str(&format!("{:?}", node.substring)),
    }
}

fn write_children(out: &mut String, node: &SyntaxTreeNode, prefix: &str, set: &GlyphSet) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { set.elbow } else { set.tee });
        write_label(out, child);
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { set.blank } else { set.pipe });
        write_children(out, child, &child_prefix, set);
    }
}
