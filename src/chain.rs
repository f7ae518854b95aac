//! Option-chain rows and the first-N / last-N selection policy.

use chrono::NaiveDateTime;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One strike of the chain, as written to the spreadsheet.
///
/// Every field except `captured_at` is cell text taken verbatim from the
/// rendered table; nothing is parsed as a number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChainRow {
    pub symbol: CompactString,
    pub expiry: CompactString,
    pub strike_price: String,
    pub call_oi: String,
    pub call_ltp: String,
    pub put_ltp: String,
    pub put_oi: String,
    pub captured_at: NaiveDateTime,
}

impl OptionChainRow {
    /// Spreadsheet header, in field order.
    pub const HEADERS: [&'static str; 8] = [
        "symbol",
        "expiry",
        "strike_price",
        "call_oi",
        "call_ltp",
        "put_ltp",
        "put_oi",
        "captured_at",
    ];
}

/// What one fetch cycle asks for.
#[derive(Clone, Debug)]
pub struct ChainRequest {
    pub symbol: CompactString,
    /// Must match a dropdown option label exactly.
    pub expiry: CompactString,
    /// Rows taken from each end of the table.
    pub rows: usize,
}

/// Zero-based `td` positions of each field within a table row.
///
/// These follow the target page's markup, so a redesign of that page is
/// fixed here and nowhere else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellOffsets {
    pub strike_price: usize,
    pub call_oi: usize,
    pub call_ltp: usize,
    pub put_ltp: usize,
    pub put_oi: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("not enough rows: table has {total}, need {required}")]
    NotEnoughRows { total: usize, required: usize },
    #[error("row {row} has no cell at offset {column}")]
    MissingCell { row: usize, column: usize },
    #[error("bad selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

/// Indices of the first `n` and last `n` rows of a `total`-row table.
///
/// Fails rather than returning a partial selection when `total < 2n`.
pub fn select_indices(total: usize, n: usize) -> Result<Vec<usize>, ExtractError> {
    let required = n.saturating_mul(2);
    if total < required {
        return Err(ExtractError::NotEnoughRows { total, required });
    }
    Ok((0..n).chain(total - n..total).collect())
}

/// Builds records from the selected rows of an already-rendered table.
///
/// `table` holds the trimmed text of every cell, row by row. All records
/// share `captured_at`.
pub fn extract_rows<R: AsRef<[String]>>(
    table: &[R],
    request: &ChainRequest,
    offsets: &CellOffsets,
    captured_at: NaiveDateTime,
) -> Result<Vec<OptionChainRow>, ExtractError> {
    select_indices(table.len(), request.rows)?
        .into_iter()
        .map(|row| {
            let cells = table[row].as_ref();
            let cell = |column: usize| {
                cells
                    .get(column)
                    .cloned()
                    .ok_or(ExtractError::MissingCell { row, column })
            };

            Ok(OptionChainRow {
                symbol: request.symbol.clone(),
                expiry: request.expiry.clone(),
                strike_price: cell(offsets.strike_price)?,
                call_oi: cell(offsets.call_oi)?,
                call_ltp: cell(offsets.call_ltp)?,
                put_ltp: cell(offsets.put_ltp)?,
                put_oi: cell(offsets.put_oi)?,
                captured_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const OFFSETS: CellOffsets = CellOffsets {
        strike_price: 2,
        call_oi: 0,
        call_ltp: 1,
        put_ltp: 3,
        put_oi: 4,
    };

    fn request(rows: usize) -> ChainRequest {
        ChainRequest {
            symbol: "NIFTY".into(),
            expiry: "29-Feb-2026".into(),
            rows,
        }
    }

    fn captured_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn table(rows: usize) -> Vec<Vec<String>> {
        (0..rows)
            .map(|i| {
                vec![
                    format!("coi{i}"),
                    format!("cltp{i}"),
                    format!("{}", 20_000 + i * 50),
                    format!("pltp{i}"),
                    format!("poi{i}"),
                ]
            })
            .collect()
    }

    #[test]
    fn selects_both_ends_of_twelve_rows() {
        let indices = select_indices(12, 5).unwrap();
        assert_eq!(indices, [0, 1, 2, 3, 4, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn exact_fit_takes_every_row_once() {
        assert_eq!(select_indices(10, 5).unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn too_few_rows_is_rejected() {
        let err = select_indices(6, 5).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::NotEnoughRows {
                total: 6,
                required: 10
            }
        ));
    }

    #[test]
    fn zero_rows_requested_selects_nothing() {
        assert!(select_indices(0, 0).unwrap().is_empty());
        assert!(select_indices(7, 0).unwrap().is_empty());
    }

    #[test]
    fn extraction_reads_offsets_and_labels() {
        let rows = extract_rows(&table(12), &request(5), &OFFSETS, captured_at()).unwrap();

        assert_eq!(rows.len(), 10);
        let strikes: Vec<_> = rows.iter().map(|r| r.strike_price.as_str()).collect();
        assert_eq!(
            strikes,
            [
                "20000", "20050", "20100", "20150", "20200", "20350", "20400", "20450", "20500",
                "20550"
            ]
        );
        for row in &rows {
            assert_eq!(row.symbol, "NIFTY");
            assert_eq!(row.expiry, "29-Feb-2026");
            assert_eq!(row.captured_at, captured_at());
        }
        assert_eq!(rows[9].call_oi, "coi11");
        assert_eq!(rows[9].call_ltp, "cltp11");
        assert_eq!(rows[9].put_ltp, "pltp11");
        assert_eq!(rows[9].put_oi, "poi11");
    }

    #[test]
    fn short_table_yields_no_records() {
        let err = extract_rows(&table(6), &request(5), &OFFSETS, captured_at()).unwrap_err();
        assert!(matches!(err, ExtractError::NotEnoughRows { .. }));
    }

    #[test]
    fn missing_cell_fails_the_whole_extraction() {
        let mut table = table(4);
        table[3].truncate(4);

        let err = extract_rows(&table, &request(2), &OFFSETS, captured_at()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingCell { row: 3, column: 4 }));
    }

    #[test]
    fn rows_outside_the_selection_may_be_ragged() {
        let mut table = table(7);
        table[3].clear();

        let rows = extract_rows(&table, &request(3), &OFFSETS, captured_at()).unwrap();
        assert_eq!(rows.len(), 6);
    }
}
