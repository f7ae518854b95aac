use core::time::Duration;
use std::borrow::Cow;

use headless_chrome::Browser;
use ocscr::{
    chain::{CellOffsets, ChainRequest, ExtractError, OptionChainRow, extract_rows},
    scrape::{
        USER_AGENT, WINDOW_SIZE, close_tab, launch, navigate_to, open_tab, page_content,
        select_option, selector, table_cells, wait_for_async, wait_for_network_idle,
    },
};
use scraper::Selector;
use tokio::time::sleep;

const HOME_URL: &str = "https://www.nseindia.com";
const CHAIN_URL: &str = "https://www.nseindia.com/option-chain";

const SYMBOL_SELECT: &str = "#equityStock";
const EXPIRY_SELECT: &str = "#expirySelect";
const ROW_SELECTOR: &str = "table tbody tr";
const CELL_SELECTOR: &str = "td";

pub const OFFSETS: CellOffsets = CellOffsets {
    strike_price: 11,
    call_oi: 1,
    call_ltp: 5,
    put_ltp: 17,
    put_oi: 21,
};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const SELECTOR_TIMEOUT: Duration = Duration::from_secs(20);
/// The chain page refuses to serve data until the home page's cookies settle.
const HOME_SETTLE: Duration = Duration::from_secs(4);

pub struct Context {
    pub request: ChainRequest,
    pub headless: bool,
    pub sel_row: Selector,
    pub sel_cell: Selector,
}

impl Context {
    pub fn new(request: ChainRequest, headless: bool) -> Result<Self, ExtractError> {
        Ok(Self {
            request,
            headless,
            sel_row: selector(ROW_SELECTOR)?,
            sel_cell: selector(CELL_SELECTOR)?,
        })
    }

    pub fn extract(&self, html: &str) -> Result<Vec<OptionChainRow>, ExtractError> {
        let table = table_cells(html, &self.sel_row, &self.sel_cell);
        tracing::debug!(target: "worker", "table has {} rows", table.len());

        extract_rows(
            &table,
            &self.request,
            &OFFSETS,
            chrono::Local::now().naive_local(),
        )
    }
}

/// One fetch cycle. Every failure is logged here and turns into an empty
/// result.
pub async fn work(ctx: &Context) -> Vec<OptionChainRow> {
    settle(fetch(ctx).await)
}

fn settle(result: anyhow::Result<Vec<OptionChainRow>>) -> Vec<OptionChainRow> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            if let Some(ExtractError::NotEnoughRows { total, required }) =
                e.downcast_ref::<ExtractError>()
            {
                tracing::warn!(
                    target: "worker",
                    "\x1b[33mnot enough rows\x1b[0m: {total} < {required}"
                );
            } else {
                tracing::error!(target: "worker", "\x1b[31mNSE error\x1b[0m: {e:?}");
            }
            Vec::new()
        }
    }
}

async fn fetch(ctx: &Context) -> anyhow::Result<Vec<OptionChainRow>> {
    let browser = launch(ctx.headless, WINDOW_SIZE).await?;
    let result = session(&browser, ctx).await;
    drop(browser);
    result
}

async fn session(browser: &Browser, ctx: &Context) -> anyhow::Result<Vec<OptionChainRow>> {
    let tab = open_tab(browser, USER_AGENT).await?;

    let result = async {
        navigate_to(&tab, Cow::Borrowed(HOME_URL), NAVIGATION_TIMEOUT).await?;
        wait_for_network_idle(&tab, NAVIGATION_TIMEOUT).await?;
        sleep(HOME_SETTLE).await;

        navigate_to(&tab, Cow::Borrowed(CHAIN_URL), NAVIGATION_TIMEOUT).await?;
        wait_for_network_idle(&tab, NAVIGATION_TIMEOUT).await?;

        wait_for_async(&tab, Cow::Borrowed(SYMBOL_SELECT), SELECTOR_TIMEOUT).await?;
        select_option(&tab, SYMBOL_SELECT, &ctx.request.symbol, SELECTOR_TIMEOUT).await?;

        wait_for_async(&tab, Cow::Borrowed(EXPIRY_SELECT), SELECTOR_TIMEOUT).await?;
        select_option(&tab, EXPIRY_SELECT, &ctx.request.expiry, SELECTOR_TIMEOUT).await?;

        wait_for_async(&tab, Cow::Borrowed(ROW_SELECTOR), SELECTOR_TIMEOUT).await?;

        let html = page_content(&tab).await?;
        anyhow::Ok(ctx.extract(&html)?)
    }
    .await;

    if let Err(e) = close_tab(tab).await {
        tracing::debug!(target: "worker", "closing tab: {e}");
    }

    result
}
