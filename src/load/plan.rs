//! Turning file content into a table definition and a bulk-copy payload.
//!
//! Nothing here touches a database: a [`LoadPlan`] is everything needed to
//! replace one table, computed from the bytes of one file.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use serde::Serialize;

use super::error::{LoadError, SchemaProblem};
use crate::database::schema::{ColumnSpec, TableSchema};
use crate::inference::{InferredType, infer_column_types, normalize_value};
use crate::staging::{SourceFile, StagingError, list_sources};
use crate::validation::input::sanitize_identifier;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode file content as UTF-8, falling back to ISO-8859-1.
///
/// A leading UTF-8 byte-order mark is dropped. The fallback uses the WHATWG
/// `windows-1252` table, which is how ISO-8859-1 labels are decoded in
/// practice. Returns `None` when neither decoding applies.
pub fn decode_content(bytes: &[u8]) -> Option<Cow<'_, str>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => Some(Cow::Borrowed(text)),
        Err(_) => WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes),
    }
}

/// Header and rows of a delimited text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    /// Raw header names, in file order
    pub headers: Vec<String>,
    /// Data rows, each as wide as the header
    pub rows: Vec<Vec<String>>,
}

/// Parse comma-delimited text with a header row.
///
/// Quoted fields may contain delimiters and line breaks. Every row must have
/// as many fields as the header.
pub fn parse_table(text: &str) -> Result<ParsedTable, SchemaProblem> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(SchemaProblem::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(ParsedTable { headers, rows })
}

/// Sanitize header names, failing on two headers that end up identical.
pub fn column_names(headers: &[String]) -> Result<Vec<String>, LoadError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::with_capacity(headers.len());

    for header in headers {
        let name = sanitize_identifier(header);
        if let Some(first) = seen.insert(name.clone(), header) {
            return Err(LoadError::Collision {
                name,
                first: first.to_string(),
                second: header.clone(),
            });
        }
        names.push(name);
    }

    Ok(names)
}

/// Everything needed to replace one table
#[derive(Debug, Clone, Serialize)]
pub struct LoadPlan {
    /// File the plan was built from
    pub source: SourceFile,
    /// Target table and its inferred columns
    pub schema: TableSchema,
    /// Number of data rows
    pub row_count: usize,
    #[serde(skip)]
    payload: Vec<u8>,
}

impl LoadPlan {
    /// Build the plan for a source from its raw content
    pub fn build(source: &SourceFile, content: &[u8]) -> Result<Self, LoadError> {
        let file = source.name.as_str();

        let text = decode_content(content).ok_or_else(|| LoadError::Decode {
            file: file.to_string(),
        })?;

        let parsed = parse_table(&text).map_err(|e| LoadError::schema(file, e))?;
        let names = column_names(&parsed.headers)?;
        let types = infer_column_types(&parsed.rows, names.len());

        let columns: Vec<ColumnSpec> = names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| ColumnSpec::new(name, ty))
            .collect();

        let schema = TableSchema::new(source.table_name.clone(), columns)
            .map_err(|e| LoadError::schema(file, e))?;

        let payload =
            render_payload(&schema, &parsed.rows).map_err(|e| LoadError::schema(file, e))?;

        Ok(Self {
            source: source.clone(),
            schema,
            row_count: parsed.rows.len(),
            payload,
        })
    }

    /// Build the plan for a source by reading it from disk
    pub fn from_file(source: &SourceFile) -> Result<Self, LoadError> {
        let content = std::fs::read(&source.path).map_err(|e| {
            LoadError::Directory(StagingError::Read {
                path: source.path.clone(),
                source: e,
            })
        })?;
        Self::build(source, &content)
    }

    /// Header line plus normalized rows, as CSV
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Inferred type of each column, in order
    pub fn column_types(&self) -> Vec<InferredType> {
        self.schema.columns().iter().map(|c| c.inferred).collect()
    }
}

/// Plan every source of a directory without loading anything.
///
/// A file that cannot be planned is reported with its error; only a failure
/// to list the directory is returned as `Err`.
pub fn plan_directory(
    dir: &Path,
) -> Result<Vec<(SourceFile, Result<LoadPlan, LoadError>)>, LoadError> {
    let sources = list_sources(dir)?;
    Ok(sources
        .into_iter()
        .map(|source| {
            let plan = LoadPlan::from_file(&source);
            (source, plan)
        })
        .collect())
}

fn render_payload(schema: &TableSchema, rows: &[Vec<String>]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(schema.columns().iter().map(|c| c.name.as_str()))?;
    for row in rows {
        let record: Vec<Cow<'_, str>> = row
            .iter()
            .zip(schema.columns())
            .map(|(value, column)| normalize_value(value, column.inferred))
            .collect();
        writer.write_record(record.iter().map(|value| value.as_bytes()))?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
