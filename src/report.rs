// src/report.rs

use crate::annotate::{Annotation, LineAnnotation};
use crate::model::RelatedFile;
use chrono::{DateTime, Utc};
use std::io::{self, Write};

pub const REPORT_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Column {
    name: &'static str,
    size: usize,
    justify: Justify,
}

impl Column {
    fn cell(&self, data: &str) -> String {
        let room = self.size.saturating_sub(1);
        let data: String = data.chars().take(room).collect();
        match self.justify {
            Justify::Left => format!(" {:<room$}", data),
            Justify::Right => format!("{:>room$} ", data),
        }
    }

    fn header(&self) -> String {
        format!("{:^size$}", self.name, size = self.size)
    }
}

/// Fixed-width text table, columns sized as fractions of the total width
#[derive(Debug, Clone)]
pub struct Table {
    width: usize,
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column(mut self, name: &'static str, fraction: f32, justify: Justify) -> Self {
        let size = (self.width as f32 * fraction) as usize;
        self.columns.push(Column { name, size, justify });
        self
    }

    /// Adds a row; missing cells render empty and extra cells are ignored.
    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn render(&self, w: &mut impl Write) -> io::Result<()> {
        let header: Vec<String> = self.columns.iter().map(Column::header).collect();
        writeln!(w, "{}", header.join("|"))?;
        writeln!(w, "+{}+", "-".repeat(self.width.saturating_sub(2)))?;

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| column.cell(row.get(i).map_or("", String::as_str)))
                .collect();
            writeln!(w, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

/// "3 days ago" style rendering of `then` relative to `now`
pub fn ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    let (count, unit) = match secs {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 30 * 86_400 => (s / 86_400, "day"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

pub fn write_annotation<A: Annotation + ?Sized>(
    w: &mut impl Write,
    annotation: &A,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(w, "{}", annotation.title())?;
    writeln!(w)?;

    let mut contributors = Table::new(REPORT_WIDTH)
        .column("NAME", 0.55, Justify::Left)
        .column("COMMITS", 0.2, Justify::Right)
        .column("LAST COMMIT", 0.25, Justify::Left);
    for contributor in annotation.contributors() {
        contributors.row(vec![
            contributor.name.clone(),
            contributor.count.to_string(),
            ago(contributor.last_commit, now),
        ]);
    }
    contributors.render(w)?;

    if !annotation.items().is_empty() {
        writeln!(w)?;
        let mut items = Table::new(REPORT_WIDTH)
            .column("ITEM", 0.15, Justify::Left)
            .column("TITLE", 0.65, Justify::Left)
            .column("STATE", 0.2, Justify::Left);
        for item in annotation.items() {
            items.row(vec![
                item.id.clone(),
                item.title.clone(),
                item.state.clone().unwrap_or_default(),
            ]);
        }
        items.render(w)?;
    }

    writeln!(w)?;
    let mut commits = Table::new(REPORT_WIDTH)
        .column("COMMIT", 0.12, Justify::Left)
        .column("AUTHOR", 0.25, Justify::Left)
        .column("WHEN", 0.18, Justify::Left)
        .column("SUBJECT", 0.45, Justify::Left);
    for commit in annotation.commits() {
        commits.row(vec![
            commit.short_id().to_string(),
            commit.author.clone(),
            ago(commit.timestamp, now),
            commit.subject.clone(),
        ]);
    }
    commits.render(w)
}

pub fn write_related(w: &mut impl Write, files: &[RelatedFile], now: DateTime<Utc>) -> io::Result<()> {
    let mut table = Table::new(REPORT_WIDTH)
        .column("NAME", 0.7, Justify::Left)
        .column("COMMITS", 0.12, Justify::Right)
        .column("LAST COMMIT", 0.18, Justify::Left);
    for file in files {
        table.row(vec![file.path.clone(), file.count.to_string(), ago(file.last_commit, now)]);
    }
    table.render(w)
}

/// One-line digest of a line annotation for the `lines` listing
pub fn line_summary(annotation: &LineAnnotation) -> String {
    let latest = annotation
        .commits
        .first()
        .map_or("", |c| c.subject.as_str());
    format!(
        "{:>5} | {:>3} commits | {:>2} people | {}",
        annotation.line.number,
        annotation.commits.len(),
        annotation.contributors().len(),
        latest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::FileAnnotation;
    use crate::testing::{commit, sample_file};
    use crate::work::Item;
    use chrono::Duration;

    #[test]
    fn test_table_layout() {
        let mut table = Table::new(20)
            .column("NAME", 0.5, Justify::Left)
            .column("N", 0.5, Justify::Right);
        table.row(vec!["averyveryverylongname".into(), "7".into()]);

        let mut out = Vec::new();
        table.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "   NAME   |    N     ");
        assert_eq!(lines[1], format!("+{}+", "-".repeat(18)));
        assert_eq!(lines[2], " averyvery|        7 ");
    }

    #[test]
    fn test_ago() {
        let now = Utc::now();
        assert_eq!(ago(now, now), "just now");
        assert_eq!(ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(ago(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(ago(now - Duration::days(3), now), "3 days ago");
        assert_eq!(ago(now - Duration::days(65), now), "2 months ago");
        assert_eq!(ago(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_annotation_report() {
        let file = sample_file("src/a.rs", 3);
        let annotation = FileAnnotation {
            file,
            commits: vec![commit("Alice <a@x.com>, Bob <b@x.com>", "S12 add login", &["src/a.rs"])],
            items: vec![Item {
                id: "S12".into(),
                title: "Login".into(),
                state: Some("Done".into()),
                url: None,
            }],
        };

        let mut out = Vec::new();
        write_annotation(&mut out, &annotation, Utc::now()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("a.rs\n"));
        assert!(text.contains(" Alice "));
        assert!(text.contains(" Bob "));
        assert!(text.contains(" Login "));
        assert!(text.contains("1 day ago"));
        assert!(text.contains("S12 add login"));
    }
}
