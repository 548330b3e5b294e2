//! HTML serialization of the comparison table and the page shell
//!
//! Pure string assembly: every status and tooltip decision is already baked
//! into the `Table`. Data-derived text is escaped here; tooltips arrive escaped.

use crate::identity::ColumnHeader;
use crate::table::{Cell, HeaderCell, Row, Table, TestRow, Verdict};

/// Render the comparison table
pub fn render_table(table: &Table, class_name: &str) -> String {
    let mut elements: Vec<String> = Vec::new();
    elements.push(format!(r#"<table class="{}">"#, escape(class_name)));

    elements.push("<tr>".to_string());
    for header in &table.headers {
        elements.push(format!(
            r#"<th class="table-header" style="text-transform: capitalize;">{}</th>"#,
            render_header(header)
        ));
    }
    elements.push("</tr>".to_string());

    let colspan = table.headers.len().max(1);
    let mut first_subheading = true;
    for row in &table.body {
        elements.push("<tr>".to_string());
        match row {
            Row::Subheading { title, description } => {
                let class = if first_subheading {
                    "first subheading"
                } else {
                    "subheading"
                };
                first_subheading = false;
                elements.push(format!(
                    r#"<th colspan="{colspan}" class="{class}" title="{description}">{title}</th>"#,
                    colspan = colspan,
                    class = class,
                    description = escape(&collapse_whitespace(description)),
                    title = escape(title),
                ));
            }
            Row::Test(test) => elements.push(render_test_row(test)),
        }
        elements.push("</tr>".to_string());
    }

    elements.push("</table>".to_string());
    elements.join("")
}

fn render_header(header: &HeaderCell) -> String {
    match header {
        HeaderCell::Title(markup) => format!(r#"<h1 class="title">{}</h1>"#, markup),
        HeaderCell::Configuration(column) => render_column_header(column),
    }
}

fn render_column_header(column: &ColumnHeader) -> String {
    let logo = column
        .logo
        .as_deref()
        .map(|src| format!(r#"<img src="{}" width="32" height="32"><br>"#, escape(src)))
        .unwrap_or_default();
    let mut text = format!(
        "<span>{}{}<br>{}</span>",
        logo,
        escape(&column.browser),
        escape(&column.version)
    );
    for detail in &column.details {
        text.push_str("<br>");
        text.push_str(&escape(detail));
    }
    text
}

fn render_test_row(row: &TestRow) -> String {
    let mut cells = format!(
        r#"<td><div style="word-break: {}" title="{}">{}</div></td>"#,
        row.word_break.as_css(),
        escape(&row.description),
        escape(&row.name)
    );
    for cell in &row.cells {
        cells.push_str(&render_cell(cell));
    }
    cells
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::NoData => r#"<td class="nodata"></td>"#.to_string(),
        Cell::Status { verdict, tooltip } => {
            let mark = if *verdict == Verdict::Unsupported {
                "&ndash;"
            } else {
                "&nbsp;"
            };
            format!(
                "<td><div class='{}' title='{}'>{}</div></td>",
                verdict.class_name(),
                tooltip.as_attr(),
                mark
            )
        }
    }
}

/// Inputs for the page shell around the report content
pub struct Page<'a> {
    pub title: &'a str,
    pub css_files: &'a [String],
    pub preview_image_url: &'a str,
    pub content: &'a str,
}

/// Wrap report content in a complete HTML document
pub fn render_page(page: &Page<'_>) -> String {
    let stylesheets: String = page
        .css_files
        .iter()
        .map(|href| format!(r#"    <link rel="stylesheet" href="{}">"#, escape(href)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <meta property="og:title" content="{title}">
    <meta property="og:image" content="{preview}">
    <meta name="twitter:card" content="summary_large_image">
{stylesheets}
</head>
<body>
{content}
</body>
</html>
"#,
        title = escape(page.title),
        preview = escape(page.preview_image_url),
        stylesheets = stylesheets,
        content = page.content,
    )
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape HTML special characters
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
