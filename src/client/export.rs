//! Task list export: a spreadsheet (CSV) and a printable PDF table.

use anyhow::Context;
use csv::Writer;

use super::view::format_day;
use crate::todos::repo_types::Task;

pub const SPREADSHEET_COLUMNS: [&str; 10] = [
    "Title",
    "Description",
    "Status",
    "Priority",
    "Category",
    "Due Date",
    "Importance",
    "Urgency",
    "Created At",
    "Notes",
];

pub const PDF_COLUMNS: [&str; 5] = ["Title", "Status", "Priority", "Category", "Due Date"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[value(name = "csv")]
    Spreadsheet,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "text/csv",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn file_name(self) -> String {
        format!("tasks.{}", self.extension())
    }

    pub fn render(self, tasks: &[Task]) -> anyhow::Result<Vec<u8>> {
        match self {
            ExportFormat::Spreadsheet => to_csv(tasks),
            ExportFormat::Pdf => Ok(to_pdf(tasks)),
        }
    }
}

fn category_label(task: &Task) -> String {
    task.category_id
        .map(|c| c.to_string())
        .unwrap_or_else(|| "No Category".to_string())
}

pub fn to_csv(tasks: &[Task]) -> anyhow::Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(SPREADSHEET_COLUMNS)
        .context("write csv header")?;
    for t in tasks {
        let notes = t
            .notes
            .iter()
            .map(|n| n.content.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        writer
            .write_record([
                t.title.clone(),
                t.description.clone().unwrap_or_default(),
                t.status.as_str().to_string(),
                t.priority.as_str().to_string(),
                category_label(t),
                t.due_date.map(|d| format_day(d.date())).unwrap_or_default(),
                t.importance.as_str().to_string(),
                t.urgency.as_str().to_string(),
                format_day(t.created_at.date()),
                notes,
            ])
            .with_context(|| format!("write csv row for task {}", t.id))?;
    }
    writer.flush().context("flush csv")?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("finish csv: {}", e.error()))
}

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 40.0;
const ROW_H: f32 = 16.0;
const FONT_SIZE: f32 = 8.0;
const TITLE_SIZE: f32 = 16.0;
const COL_WIDTHS: [f32; 5] = [195.0, 55.0, 60.0, 120.0, 85.0];

/// PDF string literal body: printable ASCII only, with the delimiters escaped.
fn pdf_text(raw: &str, width: f32) -> String {
    let max = ((width - 6.0) / (FONT_SIZE * 0.5)) as usize;
    let mut chars: Vec<char> = raw
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect();
    if chars.len() > max {
        chars.truncate(max.saturating_sub(3));
        chars.extend("...".chars());
    }
    let mut out = String::with_capacity(chars.len());
    for c in chars {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn pdf_row(task: &Task) -> [String; 5] {
    [
        task.title.clone(),
        task.status.as_str().to_string(),
        task.priority.as_str().to_string(),
        category_label(task),
        task.due_date
            .map(|d| format_day(d.date()))
            .unwrap_or_else(|| "-".to_string()),
    ]
}

fn draw_row(s: &mut String, y: f32, cells: &[String], header: bool, shaded: bool) {
    let table_w: f32 = COL_WIDTHS.iter().sum();
    if header {
        s.push_str(&format!("0.25 0.32 0.71 rg {MARGIN} {y} {table_w} {ROW_H} re f\n"));
    } else if shaded {
        s.push_str(&format!("0.95 g {MARGIN} {y} {table_w} {ROW_H} re f\n"));
    }
    let mut x = MARGIN;
    s.push_str("0.8 G 0.5 w\n");
    for w in COL_WIDTHS {
        s.push_str(&format!("{x} {y} {w} {ROW_H} re S\n"));
        x += w;
    }
    s.push_str(if header { "1 g\n" } else { "0 g\n" });
    let mut x = MARGIN;
    for (cell, w) in cells.iter().zip(COL_WIDTHS) {
        s.push_str(&format!(
            "BT /F1 {FONT_SIZE} Tf {} {} Td ({}) Tj ET\n",
            x + 3.0,
            y + 5.0,
            pdf_text(cell, w)
        ));
        x += w;
    }
}

/// Content streams, one per page; the first page carries the heading.
fn page_streams(rows: &[[String; 5]]) -> Vec<String> {
    let header: Vec<String> = PDF_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut pages = Vec::new();
    let mut rest = rows;
    loop {
        let mut s = String::new();
        let mut top = PAGE_H - MARGIN;
        if pages.is_empty() {
            s.push_str(&format!(
                "0 g BT /F1 {TITLE_SIZE} Tf {MARGIN} {} Td (Tasks List) Tj ET\n",
                top - TITLE_SIZE
            ));
            top -= TITLE_SIZE * 2.0;
        }
        let capacity = (((top - MARGIN) / ROW_H) as usize).saturating_sub(1).max(1);
        let (chunk, tail) = rest.split_at(capacity.min(rest.len()));

        let mut y = top - ROW_H;
        draw_row(&mut s, y, &header, true, false);
        for (i, row) in chunk.iter().enumerate() {
            y -= ROW_H;
            draw_row(&mut s, y, row, false, i % 2 == 1);
        }
        pages.push(s);

        rest = tail;
        if rest.is_empty() {
            return pages;
        }
    }
}

fn assemble(streams: &[String]) -> Vec<u8> {
    let kids = (0..streams.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", streams.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (i, stream) in streams.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_W} {PAGE_H}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    out.into_bytes()
}

/// Renders a "Tasks List" table; long lists continue over several pages.
pub fn to_pdf(tasks: &[Task]) -> Vec<u8> {
    let rows: Vec<[String; 5]> = tasks.iter().map(pdf_row).collect();
    assemble(&page_streams(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::repo_types::Note;
    use serde_json::json;
    use time::macros::datetime;
    use uuid::Uuid;

    fn task(title: &str) -> Task {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "userId": Uuid::nil(),
            "title": title,
            "description": "2 litres",
            "status": "TODO",
            "priority": "HIGH",
            "importance": "HIGH",
            "urgency": "LOW",
            "dueDate": "2024-05-01T00:00:00Z",
            "createdAt": "2024-04-01T09:00:00Z",
            "updatedAt": "2024-04-01T09:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn csv_has_fixed_columns_and_joined_notes() {
        let mut t = task("Buy milk");
        for content in ["skimmed", "from the corner shop"] {
            t.notes.push(Note {
                id: Uuid::new_v4(),
                task_id: t.id,
                content: content.into(),
                created_at: datetime!(2024-04-02 10:00 UTC),
            });
        }
        let mut plain = task("Call mum");
        plain.due_date = None;
        plain.category_id = Some(Uuid::nil());

        let bytes = to_csv(&[t, plain]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, SPREADSHEET_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "Buy milk");
        assert_eq!(&rows[0][2], "TODO");
        assert_eq!(&rows[0][4], "No Category");
        assert_eq!(&rows[0][5], "2024-05-01");
        assert_eq!(&rows[0][8], "2024-04-01");
        assert_eq!(&rows[0][9], "skimmed, from the corner shop");
        assert_eq!(&rows[1][4], Uuid::nil().to_string());
        assert_eq!(&rows[1][5], "");
    }

    #[test]
    fn pdf_is_well_formed() {
        let mut t = task("Fix (urgent) bug");
        t.due_date = None;
        let pdf = String::from_utf8(to_pdf(&[t])).unwrap();
        assert!(pdf.starts_with("%PDF-1.4\n"));
        assert!(pdf.ends_with("%%EOF\n"));
        assert!(pdf.contains("(Tasks List) Tj"));
        assert!(pdf.contains("(Fix \\(urgent\\) bug) Tj"));
        assert!(pdf.contains("(-) Tj"));
        for col in PDF_COLUMNS {
            assert!(pdf.contains(&format!("({col}) Tj")));
        }

        let xref: usize = pdf
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(pdf[xref..].starts_with("xref\n"));
    }

    #[test]
    fn long_lists_span_pages() {
        let tasks: Vec<Task> = (0..120).map(|i| task(&format!("task {i}"))).collect();
        let pdf = String::from_utf8(to_pdf(&tasks)).unwrap();
        let pages = pdf.matches("/Type /Page /Parent").count();
        assert!(pages >= 3, "got {pages} pages");
        assert!(pdf.contains(&format!("/Count {pages}")));
        assert!(pdf.contains("(task 0) Tj") && pdf.contains("(task 119) Tj"));
    }

    #[test]
    fn empty_list_still_renders_a_page() {
        let pdf = String::from_utf8(to_pdf(&[])).unwrap();
        assert_eq!(pdf.matches("/Type /Page /Parent").count(), 1);
    }

    #[test]
    fn long_cells_are_truncated() {
        let text = pdf_text(&"x".repeat(200), COL_WIDTHS[0]);
        assert!(text.len() < 60 && text.ends_with("..."));
        assert_eq!(pdf_text("café", 100.0), "caf?");
    }
}
