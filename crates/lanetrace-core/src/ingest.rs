//! CSV / JSON ingestion into [`RawRecord`]s.
//!
//! The CSV reader is a small RFC-4180 tokenizer: quoted fields, `""` escapes, CR/LF/CRLF record
//! separators, a leading BOM, and quoted newlines. Columns are resolved by header name through a
//! [`ColumnMap`], so differently-labelled exports of the same table load without code changes.

use crate::diagnostics::{Diagnostics, Stage};
use crate::record::{RawRecord, clean_text};
use crate::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Ingested {
    pub records: Vec<RawRecord>,
    pub diagnostics: Diagnostics,
}

/// Accepted header spellings per record field. Matching is case-insensitive and trims whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub id: Vec<String>,
    pub initial_status: Vec<String>,
    pub current_status: Vec<String>,
    pub release_date: Vec<String>,
    pub death_date: Vec<String>,
    pub death_context: Vec<String>,
    pub circumstances: Vec<String>,
    pub captivity_summary: Vec<String>,
    pub countries: Vec<String>,
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: names(&["Hebrew Name", "Name", "English Name", "id"]),
            initial_status: names(&["Initial Status", "Civilian/Soldier Status", "initial_status"]),
            current_status: names(&["Current Status", "Status", "current_status"]),
            release_date: names(&["Release Date", "release_date"]),
            death_date: names(&["Date of Death", "Death Date", "death_date"]),
            death_context: names(&["Context of Death", "Death Context", "death_context"]),
            circumstances: names(&[
                "Release/Death Circumstances",
                "Circumstances",
                "circumstances",
            ]),
            captivity_summary: names(&[
                "Kidnapping Summary (Hebrew)",
                "Kidnapping Summary",
                "Captivity Summary",
                "captivity_summary",
            ]),
            countries: names(&["Countries Involved in Deals", "Countries", "countries"]),
        }
    }
}

#[derive(Debug, Default)]
struct ResolvedColumns {
    id: usize,
    current_status: usize,
    initial_status: Option<usize>,
    release_date: Option<usize>,
    death_date: Option<usize>,
    death_context: Option<usize>,
    circumstances: Option<usize>,
    captivity_summary: Option<usize>,
    countries: Option<usize>,
}

impl ColumnMap {
    fn find(header: &[String], accepted: &[String]) -> Option<usize> {
        accepted.iter().find_map(|want| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(want.trim()))
        })
    }

    fn require(header: &[String], column: &str, accepted: &[String]) -> Result<usize> {
        Self::find(header, accepted).ok_or_else(|| Error::MissingColumn {
            column: column.to_string(),
            accepted: accepted.join(", "),
        })
    }

    fn resolve(&self, header: &[String]) -> Result<ResolvedColumns> {
        Ok(ResolvedColumns {
            id: Self::require(header, "id", &self.id)?,
            current_status: Self::require(header, "current_status", &self.current_status)?,
            initial_status: Self::find(header, &self.initial_status),
            release_date: Self::find(header, &self.release_date),
            death_date: Self::find(header, &self.death_date),
            death_context: Self::find(header, &self.death_context),
            circumstances: Self::find(header, &self.circumstances),
            captivity_summary: Self::find(header, &self.captivity_summary),
            countries: Self::find(header, &self.countries),
        })
    }
}

pub fn read_csv(text: &str, columns: &ColumnMap) -> Result<Ingested> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rows = parse_csv_rows(text)?;
    let mut rows = rows.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(Error::Csv {
            line: 1,
            message: "expected a header row".to_string(),
        });
    };
    let cols = columns.resolve(&header)?;

    let mut diagnostics = Diagnostics::new();
    let mut records = Vec::new();
    for (line, row) in rows {
        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if row.len() != header.len() {
            diagnostics.push(
                Stage::Ingest,
                None,
                format!(
                    "line {line}: expected {} fields, found {}; missing cells read as empty",
                    header.len(),
                    row.len()
                ),
            );
        }
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|s| clean_text(s));
        let id = cell(Some(cols.id)).unwrap_or_else(|| {
            let synthetic = format!("record-{line}");
            diagnostics.push(
                Stage::Ingest,
                Some(&synthetic),
                format!("line {line}: empty id; assigned synthetic id"),
            );
            synthetic
        });
        records.push(RawRecord {
            id,
            initial_status: cell(cols.initial_status),
            current_status: cell(Some(cols.current_status)),
            release_date: cell(cols.release_date),
            death_date: cell(cols.death_date),
            death_context: cell(cols.death_context),
            circumstances: cell(cols.circumstances),
            captivity_summary: cell(cols.captivity_summary),
            countries: cell(cols.countries),
        });
    }

    dedupe_ids(&mut records, &mut diagnostics);
    tracing::debug!(records = records.len(), "ingested csv");
    Ok(Ingested {
        records,
        diagnostics,
    })
}

pub fn read_json(text: &str) -> Result<Ingested> {
    let mut records: Vec<RawRecord> = serde_json::from_str(text)?;
    let mut diagnostics = Diagnostics::new();
    for (i, r) in records.iter_mut().enumerate() {
        if r.id.trim().is_empty() {
            r.id = format!("record-{}", i + 1);
            diagnostics.push(Stage::Ingest, Some(&r.id), "empty id; assigned synthetic id");
        } else {
            r.id = r.id.trim().to_string();
        }
    }
    dedupe_ids(&mut records, &mut diagnostics);
    tracing::debug!(records = records.len(), "ingested json");
    Ok(Ingested {
        records,
        diagnostics,
    })
}

/// Ids are the cache key for lane positions, so they must be unique within a dataset.
/// Renamed ids are reserved too, so a later record literally named `a#2` is pushed further.
fn dedupe_ids(records: &mut [RawRecord], diagnostics: &mut Diagnostics) {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut next_suffix: FxHashMap<String, usize> = FxHashMap::default();
    for r in records.iter_mut() {
        if seen.insert(r.id.clone()) {
            continue;
        }
        let n = next_suffix.entry(r.id.clone()).or_insert(1);
        let renamed = loop {
            *n += 1;
            let candidate = format!("{}#{}", r.id, n);
            if !seen.contains(&candidate) {
                break candidate;
            }
        };
        seen.insert(renamed.clone());
        diagnostics.push(
            Stage::Ingest,
            Some(&renamed),
            format!("duplicate id {:?}; renamed", r.id),
        );
        r.id = renamed;
    }
}

type Row = (usize, Vec<String>);

fn parse_csv_rows(input: &str) -> Result<Vec<Row>> {
    let mut p = CsvParser::new(input);
    let mut rows = Vec::new();
    while !p.eof() {
        let line = p.line;
        let mut fields = vec![p.parse_field()?];
        while p.try_consume_char(',') {
            fields.push(p.parse_field()?);
        }
        if !p.try_consume_newline() && !p.eof() {
            return Err(Error::Csv {
                line: p.line,
                message: "expected ',' or end of record".to_string(),
            });
        }
        rows.push((line, fields));
    }
    Ok(rows)
}

struct CsvParser<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> CsvParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn try_consume_char(&mut self, ch: char) -> bool {
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn try_consume_newline(&mut self) -> bool {
        match self.peek_char() {
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                true
            }
            Some('\r') => {
                self.pos += 1;
                if self.peek_char() == Some('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_field(&mut self) -> Result<String> {
        match self.peek_char() {
            Some('"') => self.parse_quoted_field(),
            Some('\n' | '\r') | None => Ok(String::new()),
            _ => Ok(self.parse_unquoted_field()),
        }
    }

    fn parse_unquoted_field(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            if ch == ',' || ch == '\n' || ch == '\r' {
                break;
            }
            out.push(ch);
            self.pos += ch.len_utf8();
        }
        out
    }

    fn parse_quoted_field(&mut self) -> Result<String> {
        let start_line = self.line;
        self.pos += 1;
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
            match ch {
                '"' if self.peek_char() == Some('"') => {
                    self.pos += 1;
                    out.push('"');
                }
                '"' => {
                    // Trailing spaces after the closing quote are tolerated.
                    while self.peek_char() == Some(' ') {
                        self.pos += 1;
                    }
                    return Ok(out);
                }
                '\n' => {
                    self.line += 1;
                    out.push(ch);
                }
                _ => out.push(ch),
            }
        }
        Err(Error::Csv {
            line: start_line,
            message: "unterminated quoted field".to_string(),
        })
    }
}
