//! Quoted CSV reader and writer. All fields are text; typing happens in [`super::coerce`].

/// Parse CSV text into rows of fields.
///
/// Handles double-quoted fields, `""` escapes inside quotes, and `\n` or `\r\n` line breaks
/// (a lone `\r` also ends a line). A final row without a trailing newline is still returned;
/// a trailing newline does not produce an extra empty row.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => current.push(std::mem::take(&mut field)),
            '\n' | '\r' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                current.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut current));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !current.is_empty() {
        current.push(field);
        rows.push(current);
    }
    rows
}

/// Escape one field: quote it when it contains a comma, a quote or a line break; double embedded quotes.
pub fn escape_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Join one row of already-textual fields.
pub fn write_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// True for a line that held nothing at all (parsed as a single empty field).
pub fn is_blank_row(row: &[String]) -> bool {
    row.len() == 1 && row[0].is_empty()
}
