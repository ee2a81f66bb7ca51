//! Single-font PDF writer for tabular reports
//!
//! Produces a PDF 1.4 file using the built-in Helvetica font with
//! WinAnsi encoding, so no font data has to be embedded.

use crate::domain::report::ReportTable;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 40.0;
const FONT_SIZE: f64 = 9.0;
const TITLE_SIZE: f64 = 14.0;
const LINE_HEIGHT: f64 = 13.0;
/// Rough Helvetica advance width as a fraction of the font size
const CHAR_WIDTH: f64 = 0.5;

pub fn render(table: &ReportTable) -> Vec<u8> {
    let pages = layout(table);
    assemble(&pages)
}

/// Page content streams with the table split across pages
fn layout(table: &ReportTable) -> Vec<String> {
    let columns = table.column_count().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f64;
    let max_chars = ((column_width / (FONT_SIZE * CHAR_WIDTH)) as usize).saturating_sub(1).max(3);

    let mut pages = Vec::new();
    let mut page = Page::start(table, column_width, max_chars);

    for row in &table.rows {
        if page.is_full() {
            pages.push(page.finish());
            page = Page::start(table, column_width, max_chars);
        }
        let cells: Vec<String> = row.iter().map(|c| c.display()).collect();
        page.row(&cells, column_width, max_chars);
    }

    if !table.summary.is_empty() {
        page.y -= LINE_HEIGHT;
        for (label, value) in &table.summary {
            if page.is_full() {
                pages.push(page.finish());
                page = Page::start(table, column_width, max_chars);
            }
            page.text(MARGIN, page.y, FONT_SIZE, &format!("{}: {}", label, value));
            page.y -= LINE_HEIGHT;
        }
    }

    pages.push(page.finish());

    let total = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(index, mut content)| {
            let footer = format!("Página {} de {}", index + 1, total);
            content.push_str(&text_op(MARGIN, MARGIN / 2.0, FONT_SIZE, &footer));
            content
        })
        .collect()
}

struct Page {
    content: String,
    y: f64,
}

impl Page {
    fn start(table: &ReportTable, column_width: f64, max_chars: usize) -> Self {
        let mut page = Self {
            content: String::new(),
            y: PAGE_HEIGHT - MARGIN - TITLE_SIZE,
        };

        page.text(MARGIN, page.y, TITLE_SIZE, &table.title);
        page.y -= TITLE_SIZE + LINE_HEIGHT;
        page.row(&table.headers, column_width, max_chars);

        let rule_y = page.y + LINE_HEIGHT - 3.0;
        page.content.push_str(&format!(
            "0.5 w {:.1} {:.1} m {:.1} {:.1} l S\n",
            MARGIN,
            rule_y,
            PAGE_WIDTH - MARGIN,
            rule_y
        ));
        page
    }

    fn is_full(&self) -> bool {
        self.y < MARGIN + LINE_HEIGHT
    }

    fn row(&mut self, cells: &[String], column_width: f64, max_chars: usize) {
        for (index, cell) in cells.iter().enumerate() {
            let x = MARGIN + index as f64 * column_width;
            self.text(x, self.y, FONT_SIZE, &truncate(cell, max_chars));
        }
        self.y -= LINE_HEIGHT;
    }

    fn text(&mut self, x: f64, y: f64, size: f64, text: &str) {
        self.content.push_str(&text_op(x, y, size, text));
    }

    fn finish(self) -> String {
        self.content
    }
}

fn text_op(x: f64, y: f64, size: f64, text: &str) -> String {
    format!(
        "BT /F1 {:.0} Tf {:.1} {:.1} Td ({}) Tj ET\n",
        size,
        x,
        y,
        escape(text)
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('~');
    truncated
}

/// Escape a string literal; Latin-1 characters become octal escapes
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_ascii_control() => escaped.push(' '),
            c if c.is_ascii() => escaped.push(c),
            c if (c as u32) <= 0xFF => escaped.push_str(&format!("\\{:03o}", c as u32)),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Serialize catalog, page tree, font, pages and the cross-reference table
fn assemble(pages: &[String]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (content, page_id) in pages.iter().zip(&page_ids) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ));
    }

    let mut output: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());

    for (index, object) in objects.iter().enumerate() {
        offsets.push(output.len());
        output.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, object).as_bytes());
    }

    let xref_offset = output.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    output.extend_from_slice(xref.as_bytes());

    output
}
