//! The editable composition model: a background color plus an ordered list
//! of styled text blocks.
//!
//! Blocks are edited copy-on-write: [`TextBlock::with`] returns a new value
//! and never mutates the instance it was called on, which is what lets the
//! export controller detect "the model changed" structurally. A block's
//! position in the sequence is its only identity.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};

/// Pixels per root-em. Block font sizes are document-relative and resolve
/// to absolute pixels through this fixed constant before rasterization.
pub const ROOT_EM_PX: f32 = 16.0;

/// Fixed pixel dimensions of the export target (a social post is 1200×675).
/// Immutable for a given export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 675,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

/// The closed set of typefaces the editor offers: a serif display face and
/// a sans fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    #[serde(rename = "GT Alpina Trial")]
    GtAlpina,
    #[serde(rename = "Oswald")]
    Oswald,
}

impl FontFamily {
    pub fn display_name(self) -> &'static str {
        match self {
            FontFamily::GtAlpina => "GT Alpina Trial",
            FontFamily::Oswald => "Oswald",
        }
    }
}

impl std::str::FromStr for FontFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gt-alpina" | "gt alpina trial" | "alpina" => Ok(FontFamily::GtAlpina),
            "oswald" => Ok(FontFamily::Oswald),
            other => Err(Error::validation(
                "fontFamily",
                format!("unknown family {other:?} (expected gt-alpina or oswald)"),
            )),
        }
    }
}

/// One styled unit of text with its own typography settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    /// Literal content; may be empty, may contain spaces (wrap unit = word)
    pub text: String,
    /// Size in root-em; resolved via [`ROOT_EM_PX`]
    pub font_size_rem: f32,
    #[serde(default = "defaults::font_style")]
    pub font_style: FontStyle,
    #[serde(default = "defaults::font_weight")]
    pub font_weight: FontWeight,
    #[serde(default = "defaults::font_family")]
    pub font_family: FontFamily,
    /// Signed px inserted after each character (negative = tighter)
    #[serde(default = "defaults::letter_spacing")]
    pub letter_spacing: f32,
    /// Unitless multiplier on the resolved px size giving the line pitch
    #[serde(default = "defaults::line_height")]
    pub line_height: f32,
    /// Vertical margin contributed before and after the block, in px
    #[serde(default)]
    pub padding_y: f32,
}

mod defaults {
    use super::{FontFamily, FontStyle, FontWeight};

    pub fn font_style() -> FontStyle {
        FontStyle::Normal
    }
    pub fn font_weight() -> FontWeight {
        FontWeight::Normal
    }
    pub fn font_family() -> FontFamily {
        FontFamily::GtAlpina
    }
    pub fn letter_spacing() -> f32 {
        -8.0
    }
    pub fn line_height() -> f32 {
        0.8
    }
}

impl Default for TextBlock {
    fn default() -> Self {
        Self {
            text: "New Text".to_string(),
            font_size_rem: 6.0,
            font_style: FontStyle::Normal,
            font_weight: FontWeight::Normal,
            font_family: FontFamily::GtAlpina,
            letter_spacing: -8.0,
            line_height: 0.8,
            padding_y: 0.0,
        }
    }
}

impl TextBlock {
    /// Absolute pixel size of this block's type
    pub fn resolved_px(&self) -> f32 {
        self.font_size_rem * ROOT_EM_PX
    }

    /// Apply one field edit, returning a new block. The receiver is left
    /// untouched. Out-of-range numeric values are rejected with an error
    /// naming the field and the violated bound.
    pub fn with(&self, edit: BlockEdit) -> Result<TextBlock> {
        let mut next = self.clone();
        match edit {
            BlockEdit::Text(text) => next.text = text,
            BlockEdit::FontSizeRem(v) => {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::validation("fontSize", format!("{v} must be > 0")));
                }
                next.font_size_rem = v;
            }
            BlockEdit::FontStyle(v) => next.font_style = v,
            BlockEdit::FontWeight(v) => next.font_weight = v,
            BlockEdit::FontFamily(v) => next.font_family = v,
            BlockEdit::LetterSpacing(v) => {
                if !v.is_finite() {
                    return Err(Error::validation("letterSpacing", format!("{v} must be finite")));
                }
                next.letter_spacing = v;
            }
            BlockEdit::LineHeight(v) => {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::validation("lineHeight", format!("{v} must be > 0")));
                }
                next.line_height = v;
            }
            BlockEdit::PaddingY(v) => {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::validation("paddingY", format!("{v} must be >= 0")));
                }
                next.padding_y = v;
            }
        }
        Ok(next)
    }
}

/// One field-level edit to a block. The editing surface addresses fields by
/// name and block index; [`BlockEdit::from_field`] is the parsing seam.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEdit {
    Text(String),
    FontSizeRem(f32),
    FontStyle(FontStyle),
    FontWeight(FontWeight),
    FontFamily(FontFamily),
    LetterSpacing(f32),
    LineHeight(f32),
    PaddingY(f32),
}

impl BlockEdit {
    /// Parse a `(field name, value)` pair from the editing surface.
    pub fn from_field(field: &str, value: serde_json::Value) -> Result<BlockEdit> {
        fn number(field: &str, value: &serde_json::Value) -> Result<f32> {
            value.as_f64().map(|v| v as f32).ok_or_else(|| {
                Error::validation(field, format!("expected a number, got {value}"))
            })
        }
        fn enum_value<T: serde::de::DeserializeOwned>(
            field: &str,
            value: serde_json::Value,
        ) -> Result<T> {
            serde_json::from_value(value).map_err(|e| Error::validation(field, e.to_string()))
        }

        match field {
            "text" => match value.as_str() {
                Some(s) => Ok(BlockEdit::Text(s.to_string())),
                None => Err(Error::validation(
                    field,
                    format!("expected a string, got {value}"),
                )),
            },
            "fontSize" => Ok(BlockEdit::FontSizeRem(number(field, &value)?)),
            "fontStyle" => Ok(BlockEdit::FontStyle(enum_value(field, value)?)),
            "fontWeight" => Ok(BlockEdit::FontWeight(enum_value(field, value)?)),
            "fontFamily" => Ok(BlockEdit::FontFamily(enum_value(field, value)?)),
            "letterSpacing" => Ok(BlockEdit::LetterSpacing(number(field, &value)?)),
            "lineHeight" => Ok(BlockEdit::LineHeight(number(field, &value)?)),
            "paddingY" => Ok(BlockEdit::PaddingY(number(field, &value)?)),
            other => Err(Error::validation(other, "unknown field".to_string())),
        }
    }
}

/// Remove the block at `index`, preserving the relative order of the rest.
pub fn delete(blocks: &[TextBlock], index: usize) -> Result<Vec<TextBlock>> {
    if index >= blocks.len() {
        return Err(Error::validation(
            "index",
            format!("{index} out of range for {} blocks", blocks.len()),
        ));
    }
    let mut next = blocks.to_vec();
    next.remove(index);
    Ok(next)
}

/// The full exportable state: background plus ordered text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub background: Color,
    #[serde(default)]
    pub canvas: CanvasSpec,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    /// Monotonic edit counter; renders are tagged with the version they
    /// were derived from so stale results can be detected.
    #[serde(skip)]
    pub version: u64,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            background: Color::new(0xA1, 0xFE, 0xA0),
            canvas: CanvasSpec::default(),
            blocks: Vec::new(),
            version: 0,
        }
    }
}

impl Composition {
    /// The document a fresh editing session starts from
    pub fn starter() -> Self {
        Self {
            blocks: vec![TextBlock {
                text: "ECLIPSE EVERYTHING!".to_string(),
                font_size_rem: 12.0,
                font_style: FontStyle::Italic,
                ..TextBlock::default()
            }],
            ..Self::default()
        }
    }

    pub fn add_block(&mut self, block: TextBlock) {
        self.blocks.push(block);
        self.version += 1;
    }

    pub fn update_block(&mut self, index: usize, edit: BlockEdit) -> Result<()> {
        let block = self.blocks.get(index).ok_or_else(|| {
            Error::validation(
                "index",
                format!("{index} out of range for {} blocks", self.blocks.len()),
            )
        })?;
        let updated = block.with(edit)?;
        self.blocks[index] = updated;
        self.version += 1;
        Ok(())
    }

    pub fn delete_block(&mut self, index: usize) -> Result<()> {
        self.blocks = delete(&self.blocks, index)?;
        self.version += 1;
        Ok(())
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_canvas_is_post_sized() {
        let c = CanvasSpec::default();
        assert_eq!(c.width, 1200);
        assert_eq!(c.height, 675);
    }

    #[test]
    fn with_returns_new_value_and_leaves_original_alone() {
        let original = TextBlock::default();
        let edited = original.with(BlockEdit::Text("hello".into())).unwrap();
        assert_eq!(edited.text, "hello");
        assert_eq!(original.text, "New Text");
        assert_eq!(edited.font_size_rem, original.font_size_rem);
    }

    #[test]
    fn rejects_nonpositive_line_height() {
        let block = TextBlock::default();
        let err = block.with(BlockEdit::LineHeight(0.0)).unwrap_err();
        match err {
            Error::Validation { field, message } => {
                assert_eq!(field, "lineHeight");
                assert!(message.contains("> 0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_nonpositive_and_nonfinite_font_size() {
        let block = TextBlock::default();
        assert!(block.with(BlockEdit::FontSizeRem(0.0)).is_err());
        assert!(block.with(BlockEdit::FontSizeRem(-3.0)).is_err());
        assert!(block.with(BlockEdit::FontSizeRem(f32::NAN)).is_err());
        assert!(block.with(BlockEdit::FontSizeRem(4.0)).is_ok());
    }

    #[test]
    fn rejects_negative_padding() {
        let block = TextBlock::default();
        assert!(block.with(BlockEdit::PaddingY(-1.0)).is_err());
        assert!(block.with(BlockEdit::PaddingY(20.0)).is_ok());
    }

    #[test]
    fn delete_preserves_order() {
        let blocks: Vec<TextBlock> = (0..4)
            .map(|i| TextBlock {
                text: format!("block {i}"),
                ..TextBlock::default()
            })
            .collect();
        let remaining = delete(&blocks, 1).unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[0].text, "block 0");
        assert_eq!(remaining[1].text, "block 2");
        assert_eq!(remaining[2].text, "block 3");
    }

    #[test]
    fn delete_out_of_range_is_rejected() {
        let blocks = vec![TextBlock::default()];
        assert!(delete(&blocks, 1).is_err());
    }

    #[test]
    fn field_edits_parse_by_name() {
        let edit = BlockEdit::from_field("fontSize", serde_json::json!(8.5)).unwrap();
        assert_eq!(edit, BlockEdit::FontSizeRem(8.5));

        let edit = BlockEdit::from_field("fontStyle", serde_json::json!("italic")).unwrap();
        assert_eq!(edit, BlockEdit::FontStyle(FontStyle::Italic));

        let edit =
            BlockEdit::from_field("fontFamily", serde_json::json!("GT Alpina Trial")).unwrap();
        assert_eq!(edit, BlockEdit::FontFamily(FontFamily::GtAlpina));

        assert!(BlockEdit::from_field("fontSize", serde_json::json!("big")).is_err());
        assert!(BlockEdit::from_field("rotation", serde_json::json!(90)).is_err());
    }

    #[test]
    fn composition_mutations_bump_version() {
        let mut comp = Composition::starter();
        assert_eq!(comp.version, 0);

        comp.add_block(TextBlock::default());
        assert_eq!(comp.version, 1);

        comp.update_block(0, BlockEdit::Text("edited".into())).unwrap();
        assert_eq!(comp.version, 2);
        assert_eq!(comp.blocks[0].text, "edited");

        comp.delete_block(1).unwrap();
        assert_eq!(comp.version, 3);
        assert_eq!(comp.blocks.len(), 1);

        comp.set_background(Color::WHITE);
        assert_eq!(comp.version, 4);
    }

    #[test]
    fn composition_survives_json_round_trip() {
        let comp = Composition::starter();
        let json = serde_json::to_string(&comp).unwrap();
        let back: Composition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.background, comp.background);
        assert_eq!(back.blocks, comp.blocks);
        assert_eq!(back.canvas, comp.canvas);
    }

    #[test]
    fn text_survives_round_trip_unmodified() {
        let block = TextBlock {
            text: "  spaces  preserved \u{00e9}\u{4f60}\u{597d} ".to_string(),
            ..TextBlock::default()
        };
        let json = serde_json::to_string(&block).unwrap();
        let back: TextBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, block.text);
    }
}
