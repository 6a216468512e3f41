//! Row parser: delimited spreadsheet text to [`ParsedRow`]s
//!
//! Headers are matched fuzzily against per-field synonym lists, so exports
//! from different ERPs ("número nf", "numero_nf", "NF") all land in the
//! same field. Quoted cells are not supported: a cell containing the
//! delimiter is split like any other.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::values::{parse_brl, parse_date, parse_overdue_days};
use crate::config::ImportSettings;
use crate::domain::{days_overdue, normalize_key, ParsedRow};

/// Semantic columns the importer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Phone,
    InvoiceNumber,
    NoteNumber,
    DueDate,
    Principal,
    Interest,
    Total,
    OverdueDays,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::Phone,
        Field::InvoiceNumber,
        Field::NoteNumber,
        Field::DueDate,
        Field::Principal,
        Field::Interest,
        Field::Total,
        Field::OverdueDays,
    ];

    /// Built-in header synonyms, in priority order
    pub fn builtin_synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::Name => &["nome", "cliente", "razao social", "razão social"],
            Field::Phone => &["telefone", "celular", "whatsapp"],
            Field::InvoiceNumber => &["numero_nf", "numero nf", "número nf", "nf", "nota fiscal"],
            Field::NoteNumber => &[
                "numero_titulo",
                "numero do titulo",
                "número do título",
                "titulo",
                "duplicata",
            ],
            Field::DueDate => &[
                "vencimento",
                "data_vencimento",
                "data vencimento",
                "dt_vencimento",
                "dt vencimento",
            ],
            Field::Principal => &["valor_principal", "valor principal", "valor nf", "valor"],
            Field::Interest => &["juros", "valor juros", "juros (r$)"],
            Field::Total => &["total", "valor total", "total (r$)"],
            Field::OverdueDays => &["dias_atraso", "dias em atraso", "dias atraso", "atraso"],
        }
    }

    /// Key used for this field in the `import.synonyms` settings section
    pub fn settings_key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::InvoiceNumber => "invoiceNumber",
            Field::NoteNumber => "noteNumber",
            Field::DueDate => "dueDate",
            Field::Principal => "principal",
            Field::Interest => "interest",
            Field::Total => "total",
            Field::OverdueDays => "overdueDays",
        }
    }
}

/// Synonym lists per field: built-ins first, configured extras after
#[derive(Debug, Clone)]
pub struct ColumnSynonyms {
    lists: HashMap<Field, Vec<String>>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        let lists = Field::ALL
            .iter()
            .map(|f| {
                let list = f.builtin_synonyms().iter().map(|s| normalize_key(s)).collect();
                (*f, list)
            })
            .collect();
        Self { lists }
    }
}

impl ColumnSynonyms {
    /// Built-ins extended with the synonyms from settings.
    /// Unknown keys and blank synonyms are ignored.
    pub fn from_settings(settings: &ImportSettings) -> Self {
        let mut synonyms = Self::default();
        for field in Field::ALL {
            if let Some(extra) = settings.synonyms.get(field.settings_key()) {
                synonyms.extend(field, extra.iter().map(String::as_str));
            }
        }
        synonyms
    }

    pub fn extend<'a>(&mut self, field: Field, extra: impl IntoIterator<Item = &'a str>) {
        let list = self.lists.entry(field).or_default();
        for synonym in extra {
            let normalized = normalize_key(synonym);
            if !normalized.is_empty() && !list.contains(&normalized) {
                list.push(normalized);
            }
        }
    }

    pub fn get(&self, field: Field) -> &[String] {
        self.lists.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pick the column for a list of (normalized) synonyms.
///
/// Exact matches win, tried in synonym order; otherwise the first header
/// that contains any synonym. When a header name repeats, the last column
/// carrying it is used.
pub fn pick(headers: &[String], candidates: &[String]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_key(h)).collect();

    for candidate in candidates {
        if let Some(idx) = normalized.iter().rposition(|h| h == candidate) {
            return Some(idx);
        }
    }

    let idx = normalized
        .iter()
        .position(|h| candidates.iter().any(|c| h.contains(c.as_str())))?;
    headers.iter().rposition(|h| *h == headers[idx])
}

/// Resolved column index per field for one header line
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String], synonyms: &ColumnSynonyms) -> Self {
        let columns = Field::ALL
            .iter()
            .filter_map(|f| pick(headers, synonyms.get(*f)).map(|idx| (*f, idx)))
            .collect();
        Self { columns }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Cell for a field, empty when the column is missing or the row is short
    pub fn cell<'a>(&self, record: &'a [String], field: Field) -> &'a str {
        self.index(field)
            .and_then(|idx| record.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// `;` when the header line carries one, `,` otherwise
pub fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Parse spreadsheet text with the built-in synonyms
pub fn parse_csv_text(text: &str, today: NaiveDate) -> Vec<ParsedRow> {
    parse_csv_text_with(text, today, &ColumnSynonyms::default())
}

/// Parse spreadsheet text into usable rows.
///
/// Fewer than two non-blank lines (header plus data) gives nothing. Rows
/// without a name, or without both invoice and note numbers, are dropped.
pub fn parse_csv_text_with(text: &str, today: NaiveDate, synonyms: &ColumnSynonyms) -> Vec<ParsedRow> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let records = tokenize(&lines, detect_delimiter(lines[0]));
    let Some((headers, data)) = records.split_first() else {
        return Vec::new();
    };

    let columns = ColumnMap::resolve(headers, synonyms);
    data.iter()
        .map(|record| parse_record(record, &columns, today))
        .filter(ParsedRow::is_usable)
        .collect()
}

/// Split lines into trimmed cells. Quoting is off, so `"` is plain text,
/// and only `\n` ends a record: a stray `\r` stays inside its cell.
fn tokenize(lines: &[&str], delimiter: u8) -> Vec<Vec<String>> {
    let joined = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .quoting(false)
        .flexible(true)
        .from_reader(joined.as_bytes());

    reader
        .records()
        .filter_map(|r| r.ok())
        .map(|record| record.iter().map(|cell| cell.trim().to_string()).collect())
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_record(record: &[String], columns: &ColumnMap, today: NaiveDate) -> ParsedRow {
    let principal_amount = parse_brl(columns.cell(record, Field::Principal));
    let interest_amount = parse_brl(columns.cell(record, Field::Interest));
    let total = parse_brl(columns.cell(record, Field::Total));
    let total_amount = if total == Decimal::ZERO {
        principal_amount + interest_amount
    } else {
        total
    };

    let due_date = parse_date(columns.cell(record, Field::DueDate));
    let mut overdue_days = parse_overdue_days(columns.cell(record, Field::OverdueDays));
    if overdue_days == 0 {
        if let Some(due) = due_date {
            overdue_days = days_overdue(due, today);
        }
    }

    ParsedRow {
        name: columns.cell(record, Field::Name).trim().to_string(),
        phone: non_empty(columns.cell(record, Field::Phone)),
        invoice_number: non_empty(columns.cell(record, Field::InvoiceNumber)),
        note_number: non_empty(columns.cell(record, Field::NoteNumber)),
        due_date,
        principal_amount,
        interest_amount,
        total_amount,
        overdue_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn synonyms(field: Field) -> Vec<String> {
        ColumnSynonyms::default().get(field).to_vec()
    }

    #[test]
    fn test_too_few_lines() {
        assert!(parse_csv_text("", today()).is_empty());
        assert!(parse_csv_text("nome;numero_nf\n\n   \n", today()).is_empty());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("nome;telefone;nf"), b';');
        assert_eq!(detect_delimiter("nome,telefone,nf"), b',');
    }

    #[test]
    fn test_invoice_number_synonyms() {
        for header in ["numero_nf", "numero nf", "número nf", "nf", "nota fiscal", "Número  NF"] {
            let h = headers(&["nome", header, "valor"]);
            assert_eq!(pick(&h, &synonyms(Field::InvoiceNumber)), Some(1), "header {}", header);
        }
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let h = headers(&["valor total", "valor"]);
        assert_eq!(pick(&h, &synonyms(Field::Principal)), Some(1));
        assert_eq!(pick(&h, &synonyms(Field::Total)), Some(0));
    }

    #[test]
    fn test_substring_match() {
        let h = headers(&["Nome do Cliente", "Data Vencimento Original"]);
        assert_eq!(pick(&h, &synonyms(Field::Name)), Some(0));
        assert_eq!(pick(&h, &synonyms(Field::DueDate)), Some(1));
        assert_eq!(pick(&h, &synonyms(Field::Phone)), None);
    }

    #[test]
    fn test_configured_synonyms() {
        let mut settings = ImportSettings::default();
        settings
            .synonyms
            .insert("name".to_string(), vec!["Fornecedor".to_string(), " ".to_string()]);
        let synonyms = ColumnSynonyms::from_settings(&settings);

        let text = "fornecedor;nf\nAgro Sul;NF-1";
        let rows = parse_csv_text_with(text, today(), &synonyms);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Agro Sul");
    }

    #[test]
    fn test_end_to_end_row() {
        let text = "nome;telefone;numero_nf;numero_titulo;valor_principal;juros;total;dias_atraso\n\
                    Fazenda São João;+5565999990001;NF-12401;DUP-001;15000;750;15750;12";
        let rows = parse_csv_text(text, today());

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.name, "Fazenda São João");
        assert_eq!(row.phone.as_deref(), Some("+5565999990001"));
        assert_eq!(row.invoice_number.as_deref(), Some("NF-12401"));
        assert_eq!(row.note_number.as_deref(), Some("DUP-001"));
        assert_eq!(row.principal_amount, Decimal::new(15000, 0));
        assert_eq!(row.interest_amount, Decimal::new(750, 0));
        assert_eq!(row.total_amount, Decimal::new(15750, 0));
        assert_eq!(row.overdue_days, 12);
        assert_eq!(row.due_date, None);
    }

    #[test]
    fn test_total_falls_back_to_principal_plus_interest() {
        let text = "nome;nf;valor;juros;total\nAgro Sul;NF-1;1.000,00;50,25;\nAgro Sul;NF-2;100;0;0";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows[0].total_amount, Decimal::new(105025, 2));
        assert_eq!(rows[1].total_amount, Decimal::new(100, 0));
    }

    #[test]
    fn test_overdue_days_from_due_date() {
        let text = "nome,nf,vencimento\nAgro Sul,NF-1,31/01/2026\nAgro Sul,NF-2,20/02/2026";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows[0].overdue_days, 10);
        assert_eq!(rows[0].due_date, NaiveDate::from_ymd_opt(2026, 1, 31));
        assert_eq!(rows[1].overdue_days, 0);
    }

    #[test]
    fn test_explicit_overdue_days_win() {
        let text = "nome,nf,vencimento,dias_atraso\nAgro Sul,NF-1,31/01/2026,5";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows[0].overdue_days, 5);
    }

    #[test]
    fn test_unusable_rows_dropped() {
        let text = "nome;nf;duplicata\n;NF-1;\nAgro Sul;;\nAgro Sul;;DUP-9\nAgro Sul;NF-2;";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].note_number.as_deref(), Some("DUP-9"));
        assert_eq!(rows[1].invoice_number.as_deref(), Some("NF-2"));
    }

    #[test]
    fn test_short_rows_and_crlf() {
        let text = "nome,nf,telefone\r\nAgro Sul,NF-1\r\n";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phone, None);
    }

    #[test]
    fn test_lone_carriage_return_does_not_split_rows() {
        let text = "nome,nf\nA\rB,NF-1\nAgro Sul,NF-2";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "A\rB");
        assert_eq!(rows[0].invoice_number.as_deref(), Some("NF-1"));
        assert_eq!(rows[1].name, "Agro Sul");
    }

    #[test]
    fn test_quoted_cells_are_not_special() {
        let text = "nome,nf,valor\n\"Silva, Irmãos\",NF-1,100";
        let rows = parse_csv_text(text, today());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "\"Silva");
        assert_eq!(rows[0].invoice_number.as_deref(), Some("Irmãos\""));
    }
}
