//! テスト用ユーティリティ
//!
//! 複数のテストモジュールで使用される `.xlsx` フィクスチャと
//! ブラウザ環境のテストダブルを提供します。
#![cfg(test)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::runtime::{
    BoundElement,
    Document,
    PreferenceStore,
    RuntimeError,
};

/// テスト用の `.xlsx` ファイルを組み立てる
///
/// すべてのセルは共有文字列として書き込まれる。空文字列のセルは
/// 書き込まれない（Excel が空セルを省略するのと同じ）。
#[derive(Debug, Default)]
pub(crate) struct WorkbookFixture {
    /// シート名と行
    sheets: Vec<(String, Vec<Vec<String>>)>,
    /// 共有文字列パートを省略するか
    omit_shared_strings: bool,
}

impl WorkbookFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().copied().map(String::from).collect())
            .collect();
        self.sheets.push((name.to_string(), rows));
        self
    }

    pub(crate) const fn without_shared_strings(mut self) -> Self {
        self.omit_shared_strings = true;
        self
    }

    pub(crate) fn write(&self, path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let mut pool: Vec<String> = Vec::new();
        let mut index_of = |text: &str| -> usize {
            if let Some(i) = pool.iter().position(|s| s == text) {
                i
            } else {
                pool.push(text.to_string());
                pool.len() - 1
            }
        };

        let mut sheet_entries = String::new();
        let mut rel_entries = String::new();
        let mut sheet_parts = Vec::new();
        for (n, (name, rows)) in self.sheets.iter().enumerate() {
            let id = n + 1;
            sheet_entries.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#
            ));
            rel_entries.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));

            let mut data = String::new();
            for (r, row) in rows.iter().enumerate() {
                data.push_str(&format!(r#"<row r="{}">"#, r + 1));
                for cell in row.iter().filter(|cell| !cell.is_empty()) {
                    data.push_str(&format!(r#"<c t="s"><v>{}</v></c>"#, index_of(cell)));
                }
                data.push_str("</row>");
            }
            sheet_parts.push((
                format!("xl/worksheets/sheet{id}.xml"),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
                ),
            ));
        }

        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
        );
        let rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rel_entries}</Relationships>"#
        );

        let mut parts = vec![
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
        ];
        parts.extend(sheet_parts);
        if !self.omit_shared_strings {
            let items: String = pool
                .iter()
                .map(|s| format!("<si><t>{}</t></si>", quick_xml::escape::escape(s.as_str())))
                .collect();
            parts.push((
                "xl/sharedStrings.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{items}</sst>"#
                ),
            ));
        }

        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
}

/// メモリ上の DOM 要素
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryElement {
    /// 属性と内部マークアップ
    inner: Rc<RefCell<ElementState>>,
}

/// `MemoryElement` の状態
#[derive(Debug, Default)]
struct ElementState {
    /// 属性
    attributes: HashMap<String, String>,
    /// 内部マークアップ
    inner_html: String,
}

impl MemoryElement {
    pub(crate) fn with_attribute(name: &str, value: &str) -> Self {
        let element = Self::default();
        element.inner.borrow_mut().attributes.insert(name.to_string(), value.to_string());
        element
    }

    pub(crate) fn with_content(self, html: &str) -> Self {
        self.inner.borrow_mut().inner_html = html.to_string();
        self
    }

    pub(crate) fn inner_html(&self) -> String {
        self.inner.borrow().inner_html.clone()
    }

    pub(crate) fn get(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }
}

impl BoundElement for MemoryElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name)
    }

    fn set_inner_html(&self, html: &str) -> Result<(), RuntimeError> {
        self.inner.borrow_mut().inner_html = html.to_string();
        Ok(())
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<(), RuntimeError> {
        self.inner.borrow_mut().attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// メモリ上のドキュメント
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryDocument {
    /// 文書順の要素
    elements: Vec<MemoryElement>,
}

impl MemoryDocument {
    pub(crate) fn new(elements: &[MemoryElement]) -> Self {
        Self { elements: elements.to_vec() }
    }
}

impl Document for MemoryDocument {
    type Element = MemoryElement;

    fn elements_with_attribute(&self, attribute: &str) -> Result<Vec<MemoryElement>, RuntimeError> {
        Ok(self.elements.iter().filter(|e| e.get(attribute).is_some()).cloned().collect())
    }
}

/// メモリ上の設定ストア（`localStorage` の代わり）
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    /// 保存された値
    values: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub(crate) fn with(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.values.borrow_mut().insert(key.to_string(), value.to_string());
        store
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.value(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RuntimeError> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
