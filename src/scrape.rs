use scraper::{Html, Selector};

use crate::chain::ExtractError;

mod puppeteer;

pub use puppeteer::*;

/// Desktop Chrome on Windows; the default headless UA gets blocked.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const WINDOW_SIZE: (u32, u32) = (1366, 768);

pub fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_owned(),
        reason: e.to_string(),
    })
}

/// Text of every `sel_cell` under every `sel_row` in `html`, in document
/// order, each cell trimmed.
pub fn table_cells(html: &str, sel_row: &Selector, sel_cell: &Selector) -> Vec<Vec<String>> {
    let document = Html::parse_document(html);
    document
        .select(sel_row)
        .map(|tr| {
            tr.select(sel_cell)
                .map(|td| td.text().collect::<String>().trim().to_owned())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_read_per_row_and_trimmed() {
        let html = r##"
            <table>
                <thead><tr><td>head</td></tr></thead>
                <tbody>
                    <tr><td> 1 </td><td><a href="#">2,<b>500</b></a></td></tr>
                    <tr><td>-</td></tr>
                </tbody>
            </table>
        "##;
        let cells = table_cells(
            html,
            &selector("table tbody tr").unwrap(),
            &selector("td").unwrap(),
        );

        assert_eq!(cells, [vec!["1", "2,500"], vec!["-"]]);
    }

    #[test]
    fn rows_of_every_matching_table_are_collected() {
        let html = "<table><tr><td>a</td></tr></table><div><table><tr><td>b</td></tr></table></div>";
        let cells = table_cells(
            html,
            &selector("table tbody tr").unwrap(),
            &selector("td").unwrap(),
        );

        assert_eq!(cells, [vec!["a"], vec!["b"]]);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = selector("td[").unwrap_err();
        assert!(matches!(err, ExtractError::Selector { ref selector, .. } if selector == "td["));
    }
}
