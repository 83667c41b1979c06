//! Browsable HTML view of a store
//!
//! [`render_html`] turns a [`Table`] into a standalone page backed by
//! DataTables (sorting, search, paging in the browser). With the `server`
//! feature, [`serve`] exposes that page on a local HTTP listener.

#[cfg(feature = "server")]
mod server;

#[cfg(feature = "server")]
pub use server::{open_browser, router, serve, ViewState};

use serde_json::{json, Map, Value};

use crate::table::{Table, SEPARATOR};
use crate::Result;

const HEAD: &str = r#"<head>
    <meta charset="utf-8" />
    <title>hypernotes</title>
    <script src="https://code.jquery.com/jquery-3.7.1.min.js"
        crossorigin="anonymous"></script>
    <link rel="stylesheet" type="text/css"
        href="https://cdn.datatables.net/1.13.8/css/jquery.dataTables.min.css">
    <script type="text/javascript" charset="utf8"
        src="https://cdn.datatables.net/1.13.8/js/jquery.dataTables.min.js"></script>
</head>"#;

/// Render a table as a standalone HTML page.
///
/// # Errors
///
/// Returns error if the row data cannot be encoded as JSON.
pub fn render_html(table: &Table) -> Result<String> {
    let rows: Vec<Map<String, Value>> = table.rows().collect();
    let data = script_safe(&serde_json::to_string(&rows)?);

    // DataTables reads dots in `data` as nested property access
    let columns: Vec<Value> = table
        .column_names()
        .map(|name| {
            json!({
                "data": name.replace(SEPARATOR, "\\."),
                "defaultContent": "",
            })
        })
        .collect();
    let columns = script_safe(&serde_json::to_string(&columns)?);

    let header: String = table
        .column_names()
        .map(|name| format!("<th>{}</th>", escape_html(name)))
        .collect();

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
{HEAD}
<body>
    <div class="container">
        <table id="store_table" class="display nowrap" width="100%">
            <thead>
                <tr>{header}</tr>
            </thead>
        </table>
    </div>
    <script type="text/javascript">
        var data = {data};
        $(document).ready(function () {{
            $('#store_table').DataTable({{ data: data, columns: {columns}, scrollX: true }});
        }});
    </script>
</body>
</html>
"#
    ))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Keep embedded JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
