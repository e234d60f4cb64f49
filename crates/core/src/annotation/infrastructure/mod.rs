pub mod bitmap_font;
pub mod label_annotator;
