use unicode_width::UnicodeWidthStr;

/// Width of `text` in terminal columns; wide (CJK) characters count as two.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Right-pad `text` with spaces to `width` display columns.
pub fn pad(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len() + width);
    out.push_str(text);
    for _ in display_width(text)..width {
        out.push(' ');
    }
    out
}

/// Widest cell of each column. Short rows leave later columns alone.
pub fn column_widths<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<usize> {
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let w = display_width(cell.as_ref());
            match widths.get_mut(i) {
                Some(max) => *max = (*max).max(w),
                None => widths.push(w),
            }
        }
    }
    widths
}

/// Lay rows out in aligned columns separated by `gap` spaces. Empty trailing
/// cells and trailing whitespace are dropped.
pub fn align<S: AsRef<str>>(rows: &[Vec<S>], gap: usize) -> Vec<String> {
    let widths = column_widths(rows);
    let sep = " ".repeat(gap);
    rows.iter()
        .map(|row| {
            let last = row
                .iter()
                .rposition(|c| !c.as_ref().is_empty())
                .map_or(0, |i| i + 1);
            let mut line = String::new();
            for (i, cell) in row[..last].iter().enumerate() {
                if i > 0 {
                    line.push_str(&sep);
                }
                if i + 1 == last {
                    line.push_str(cell.as_ref());
                } else {
                    line.push_str(&pad(cell.as_ref(), widths[i]));
                }
            }
            line
        })
        .collect()
}

/// Plain-text table with a header rule, used for console summaries.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut all = Vec::with_capacity(self.rows.len() + 2);
        all.push(self.header.clone());
        let widths = column_widths(&all.iter().chain(&self.rows).cloned().collect::<Vec<_>>());
        all.push(widths.iter().map(|w| "-".repeat(*w)).collect());
        all.extend(self.rows.iter().cloned());

        let mut out = align(&all, 2).join("\n");
        out.push('\n');
        out
    }
}
