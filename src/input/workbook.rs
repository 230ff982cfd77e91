//! Reader for the parts of an `.xlsx` workbook the translation loader needs.
//!
//! An `.xlsx` file is a zip container of XML parts. Only three of them
//! matter here: the sheet list (`xl/workbook.xml` and its relationships),
//! the shared string pool and the worksheets themselves.

use std::collections::HashMap;
use std::fs::File;
use std::io::{
    BufReader,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};

use quick_xml::Reader;
use quick_xml::events::{
    BytesStart,
    Event,
};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::BuildError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// The workbook's deduplicated string pool, indexed by `t="s"` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStrings(Vec<String>);

impl SharedStrings {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

/// A worksheet listed in the workbook, with the zip path of its XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetRef {
    pub name: String,
    pub part: String,
}

/// An opened `.xlsx` container.
pub struct Workbook {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("path", &self.path)
            .field("parts", &self.archive.len())
            .finish()
    }
}

impl Workbook {
    /// Opens the workbook container.
    ///
    /// # Errors
    /// `BuildError::FileAccess` when the file is missing, unreadable or not a
    /// zip container.
    pub fn open(path: &Path) -> Result<Self, BuildError> {
        let file = File::open(path).map_err(|e| BuildError::file_access(path, e))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| BuildError::file_access(path, zip_error_to_io(e)))?;
        tracing::debug!(path = %path.display(), parts = archive.len(), "Opened workbook");
        Ok(Self { path: path.to_path_buf(), archive })
    }

    /// Reads the shared string pool.
    ///
    /// # Errors
    /// `BuildError::Format` when the pool is absent or cannot be parsed.
    pub fn shared_strings(&mut self) -> Result<SharedStrings, BuildError> {
        let xml = self.require_part(SHARED_STRINGS_PART)?;
        let strings = parse_shared_strings(&xml)
            .map_err(|e| self.part_error(SHARED_STRINGS_PART, &e))?;
        Ok(SharedStrings(strings))
    }

    /// Lists worksheets in workbook order.
    ///
    /// # Errors
    /// `BuildError::Format` when the sheet list or its relationships are
    /// absent or cannot be parsed.
    pub fn worksheets(&mut self) -> Result<Vec<WorksheetRef>, BuildError> {
        let workbook_xml = self.require_part(WORKBOOK_PART)?;
        let rels_xml = self.require_part(WORKBOOK_RELS_PART)?;

        let sheets =
            parse_sheet_list(&workbook_xml).map_err(|e| self.part_error(WORKBOOK_PART, &e))?;
        let targets = parse_worksheet_targets(&rels_xml)
            .map_err(|e| self.part_error(WORKBOOK_RELS_PART, &e))?;

        let mut worksheets = Vec::with_capacity(sheets.len());
        for (name, relationship_id) in sheets {
            let Some(target) = targets.get(&relationship_id) else {
                tracing::debug!(sheet = %name, "Skipping sheet that is not a worksheet");
                continue;
            };
            worksheets.push(WorksheetRef { name, part: resolve_part_path(target) });
        }
        Ok(worksheets)
    }

    /// Reads every row of a worksheet with cells decoded to strings.
    ///
    /// Cells without a value are dropped, so a row with blank cells comes
    /// back shorter than the header.
    ///
    /// # Errors
    /// `BuildError::Format` when the worksheet part is absent or malformed.
    pub fn rows(
        &mut self,
        sheet: &WorksheetRef,
        shared: &SharedStrings,
    ) -> Result<Vec<Vec<String>>, BuildError> {
        let xml = self.require_part(&sheet.part)?;
        parse_rows(&xml, shared).map_err(|e| self.part_error(&sheet.part, &e))
    }

    fn require_part(&mut self, name: &str) -> Result<String, BuildError> {
        let mut part = match self.archive.by_name(name) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => {
                return Err(BuildError::format(&self.path, format!("missing part '{name}'")));
            }
            Err(e) => {
                return Err(BuildError::format(
                    &self.path,
                    format!("cannot read part '{name}': {e}"),
                ));
            }
        };

        let mut xml = String::new();
        part.read_to_string(&mut xml).map_err(|e| {
            BuildError::format(&self.path, format!("cannot read part '{name}': {e}"))
        })?;
        Ok(xml)
    }

    fn part_error(&self, name: &str, error: &quick_xml::Error) -> BuildError {
        BuildError::format(&self.path, format!("malformed part '{name}': {error}"))
    }
}

fn zip_error_to_io(error: ZipError) -> std::io::Error {
    match error {
        ZipError::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
    }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_part_path(target: &str) -> String {
    target.strip_prefix('/').map_or_else(|| format!("xl/{target}"), str::to_string)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Phonetic runs (<rPh>) carry reading hints, not cell text.
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    if let Some(text) = current.take() {
                        strings.push(text);
                    }
                }
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Text(t) if in_text && phonetic_depth == 0 => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) if in_text && phonetic_depth == 0 => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// Returns `(sheet name, relationship id)` pairs in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute_value(&e, b"name")?.unwrap_or_default();
                if let Some(relationship_id) = relationship_id(&e)? {
                    sheets.push((name, relationship_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Returns relationship id -> target for worksheet relationships only.
fn parse_worksheet_targets(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let is_worksheet = attribute_value(&e, b"Type")?
                    .is_some_and(|kind| kind.ends_with("/worksheet"));
                if !is_worksheet {
                    continue;
                }
                if let (Some(id), Some(target)) =
                    (attribute_value(&e, b"Id")?, attribute_value(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

/// Which text node of a cell is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// `<v>` raw value
    Value,
    /// `<is><t>` inline string
    Inline,
}

/// Cell type from the `t` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    SharedString,
    InlineString,
    Plain,
}

/// A cell being read.
#[derive(Debug)]
struct PendingCell {
    kind: CellKind,
    value: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let kind = match attribute_value(start, b"t")?.as_deref() {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            _ => CellKind::Plain,
        };
        Ok(Self { kind, value: None, inline: None })
    }

    fn push(&mut self, capture: Capture, text: &str) {
        let slot = match capture {
            Capture::Value => &mut self.value,
            Capture::Inline => &mut self.inline,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn decode(self, shared: &SharedStrings) -> Option<String> {
        match self.kind {
            CellKind::SharedString => {
                let index = self.value?.trim().parse::<usize>().ok()?;
                shared.get(index).map(str::to_string)
            }
            CellKind::InlineString => self.inline.or(self.value),
            CellKind::Plain => self.value,
        }
    }
}

fn parse_rows(xml: &str, shared: &SharedStrings) -> Result<Vec<Vec<String>>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut capture: Option<Capture> = None;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => cell = Some(PendingCell::from_start(&e)?),
                b"v" if cell.is_some() => capture = Some(Capture::Value),
                b"t" if cell.is_some() && phonetic_depth == 0 => capture = Some(Capture::Inline),
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"row" {
                    rows.push(Vec::new());
                }
            }
            Event::Text(t) => {
                if let (Some(capture), Some(cell)) = (capture, cell.as_mut()) {
                    cell.push(capture, &t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = None,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"c" => {
                    if let (Some(done), Some(row)) = (cell.take(), row.as_mut())
                        && let Some(text) = done.decode(shared)
                    {
                        row.push(text);
                    }
                }
                b"row" => {
                    if let Some(done) = row.take() {
                        rows.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn attribute_value(
    element: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>, quick_xml::Error> {
    element
        .try_get_attribute(name)?
        .map(|attr| attr.unescape_value().map(std::borrow::Cow::into_owned))
        .transpose()
}

/// Finds the namespaced `id` attribute (`r:id`) of a `<sheet>`.
fn relationship_id(element: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::test_utils::WorkbookFixture;

    fn shared(strings: &[&str]) -> SharedStrings {
        SharedStrings(strings.iter().copied().map(String::from).collect())
    }

    #[rstest]
    fn parse_shared_strings_plain_and_rich_text() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>key</t></si>
  <si><r><t>Hello </t></r><r><rPr><b/></rPr><t>World</t></r></si>
  <si><t>Fish &amp; Chips</t><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
  <si/>
</sst>"#;

        let strings = parse_shared_strings(xml).unwrap();

        assert_that!(
            strings,
            elements_are![eq("key"), eq("Hello World"), eq("Fish & Chips"), eq("")]
        );
    }

    #[rstest]
    fn parse_shared_strings_keeps_whitespace() {
        let xml = r#"<sst><si><t xml:space="preserve">  padded </t></si></sst>"#;

        let strings = parse_shared_strings(xml).unwrap();

        assert_that!(strings, elements_are![eq("  padded ")]);
    }

    #[rstest]
    fn parse_shared_strings_malformed() {
        let xml = "<sst><si><t>open</si></sst>";

        assert_that!(parse_shared_strings(xml), err(anything()));
    }

    #[rstest]
    fn parse_rows_decodes_cell_types() {
        let xml = r#"<worksheet><sheetData>
  <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
  <row r="2"><c r="A2" t="inlineStr"><is><t>inline</t></is></c><c r="B2"><v>42</v></c><c r="C2" t="str"><v>formula</v></c></row>
</sheetData></worksheet>"#;

        let rows = parse_rows(xml, &shared(&["key", "en"])).unwrap();

        assert_that!(
            rows,
            elements_are![
                elements_are![eq("key"), eq("en")],
                elements_are![eq("inline"), eq("42"), eq("formula")]
            ]
        );
    }

    #[rstest]
    #[case::empty_cell(r#"<row><c r="A1" t="s"><v>0</v></c><c r="B1" s="3"/></row>"#)]
    #[case::index_out_of_range(r#"<row><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>9</v></c></row>"#)]
    #[case::bad_index(r#"<row><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>x</v></c></row>"#)]
    fn parse_rows_drops_cells_without_value(#[case] row: &str) {
        let xml = format!("<worksheet><sheetData>{row}</sheetData></worksheet>");

        let rows = parse_rows(&xml, &shared(&["title"])).unwrap();

        assert_that!(rows, elements_are![elements_are![eq("title")]]);
    }

    #[rstest]
    fn parse_rows_keeps_empty_rows() {
        let xml = r#"<worksheet><sheetData><row r="1"/><row r="2"><c><v>1</v></c></row></sheetData></worksheet>"#;

        let rows = parse_rows(xml, &SharedStrings::default()).unwrap();

        assert_that!(rows, elements_are![len(eq(0)), elements_are![eq("1")]]);
    }

    #[rstest]
    fn parse_sheet_list_and_targets() {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Home" sheetId="1" r:id="rId1"/>
    <sheet name="Chart" sheetId="2" r:id="rId2"/>
    <sheet name="About" sheetId="3" r:id="rId3"/>
  </sheets></workbook>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet" Target="chartsheets/sheet1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

        let sheets = parse_sheet_list(workbook).unwrap();
        let targets = parse_worksheet_targets(rels).unwrap();

        assert_that!(sheets.len(), eq(3));
        assert_that!(sheets[0].0.as_str(), eq("Home"));
        assert_that!(sheets[0].1.as_str(), eq("rId1"));
        assert_that!(targets.len(), eq(2));
        assert_that!(resolve_part_path(&targets["rId1"]), eq("xl/worksheets/sheet1.xml"));
        assert_that!(resolve_part_path(&targets["rId3"]), eq("xl/worksheets/sheet2.xml"));
    }

    #[rstest]
    fn open_missing_file_is_file_access_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = Workbook::open(&temp_dir.path().join("language.xlsx"));

        assert!(matches!(result, Err(BuildError::FileAccess { .. })));
    }

    #[rstest]
    fn open_non_zip_file_is_file_access_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("language.xlsx");
        std::fs::write(&path, "key,en,de\n").unwrap();

        let result = Workbook::open(&path);

        assert!(matches!(result, Err(BuildError::FileAccess { .. })));
    }

    #[rstest]
    fn missing_shared_strings_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("language.xlsx");
        WorkbookFixture::new()
            .sheet("Sheet1", &[&["key", "en"], &["title", "Hello"]])
            .without_shared_strings()
            .write(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        let result = workbook.shared_strings();

        assert!(matches!(result, Err(BuildError::Format { .. })));
        assert_that!(format!("{}", result.unwrap_err()), contains_substring("sharedStrings.xml"));
    }

    #[rstest]
    fn reads_worksheets_in_workbook_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("language.xlsx");
        WorkbookFixture::new()
            .sheet("Home", &[&["key", "en"], &["title", "Hello"]])
            .sheet("About", &[&["key", "en"], &["team", "Team"]])
            .write(&path);

        let mut workbook = Workbook::open(&path).unwrap();
        let shared = workbook.shared_strings().unwrap();
        let sheets = workbook.worksheets().unwrap();

        assert_that!(
            sheets,
            elements_are![
                field!(WorksheetRef.name, eq("Home")),
                field!(WorksheetRef.name, eq("About"))
            ]
        );
        let rows = workbook.rows(&sheets[1], &shared).unwrap();
        assert_that!(
            rows,
            elements_are![elements_are![eq("key"), eq("en")], elements_are![eq("team"), eq("Team")]]
        );
    }
}
