//! Build inputs: the translation spreadsheet and the HTML templates.

pub mod template;
pub mod translation;
pub mod workbook;
