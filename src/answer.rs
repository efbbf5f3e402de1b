use serde_json::Value;

/// The engine's answer: free text or a tabular record set.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerPayload {
    Text(String),
    Table {
        columns: Vec<String>,
        /// Cells positionally aligned with `columns`; short rows pad with blanks.
        rows: Vec<Vec<Value>>,
    },
}

/// A postable rendering of an [`AnswerPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedReply {
    pub log_text: String,
    /// `log_text` with newlines replaced by `<br>` so the chat renderer
    /// keeps the line structure.
    pub html_body: String,
}

/// Deterministic, total conversion from an answer to its postable form.
pub fn format_answer(payload: &AnswerPayload) -> FormattedReply {
    let log_text = match payload {
        AnswerPayload::Text(s) => s.trim().to_string(),
        AnswerPayload::Table { columns, rows } => render_grid(columns, rows),
    };
    let html_body = log_text.replace('\n', "<br>");
    FormattedReply {
        log_text,
        html_body,
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            // Integers print plain, floats to two decimals.
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else if let Some(f) = n.as_f64() {
                format!("{f:.2}")
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Fixed-width grid with box-drawing borders: header row, `=` rule under
/// the header, one line per record with a `-` rule after each.
fn render_grid(columns: &[String], rows: &[Vec<Value>]) -> String {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|i| row.get(i).map(render_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rendered
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |fill: char| {
        let mut line = String::from("+");
        for &width in &widths {
            line.extend(std::iter::repeat(fill).take(width + 2));
            line.push('+');
        }
        line
    };
    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(widths.iter().copied()) {
            line.push_str(&format!(" {cell:<width$} |"));
        }
        line
    };

    let mut lines = vec![rule('-'), render_row(columns), rule('=')];
    for row in &rendered {
        lines.push(render_row(row));
        lines.push(rule('-'));
    }
    lines.join("\n")
}
