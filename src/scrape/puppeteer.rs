use std::{borrow::Cow, ffi::OsStr, sync::Arc, time::Duration};

use headless_chrome::{Browser, LaunchOptions, Tab, browser::tab::NoElementFound};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::{
    task::spawn_blocking,
    time::{Instant, sleep, timeout},
};

const PERIOD: Duration = Duration::from_millis(1000 / 4);
const QUIET: Duration = Duration::from_millis(500);

pub fn puppeteer(headless: bool, window_size: (u32, u32)) -> anyhow::Result<Browser> {
    Browser::new(LaunchOptions {
        args: vec![
            OsStr::new("--disable-http2"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ],
        headless,
        window_size: Some(window_size),
        ..LaunchOptions::default()
    })
}

pub async fn launch(headless: bool, window_size: (u32, u32)) -> anyhow::Result<Browser> {
    spawn_blocking(move || puppeteer(headless, window_size)).await?
}

#[allow(clippy::significant_drop_tightening)]
pub fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

pub async fn open_tab(browser: &Browser, user_agent: &'static str) -> anyhow::Result<Arc<Tab>> {
    let browser = browser.clone();

    spawn_blocking(move || {
        let tab = first_tab(&browser)?;
        tab.set_user_agent(user_agent, None, None)?;
        Ok(tab)
    })
    .await?
}

pub async fn close_tab(tab: Arc<Tab>) -> anyhow::Result<()> {
    spawn_blocking(move || tab.close(true).map(|_| ())).await?
}

pub async fn navigate_to(
    tab: &Arc<Tab>,
    url: Cow<'static, str>,
    limit: Duration,
) -> anyhow::Result<()> {
    let tab = tab.clone();

    spawn_blocking(move || {
        tab.set_default_timeout(limit)
            .navigate_to(&url)?
            .wait_until_navigated()
            .map(|_| ())
    })
    .await?
}

/// Evaluates `expression` in the page and decodes its JSON-serialized value.
pub async fn evaluate_json<T: DeserializeOwned>(
    tab: &Arc<Tab>,
    expression: &str,
) -> anyhow::Result<T> {
    let tab = tab.clone();
    let wrapped = format!("JSON.stringify({expression})");

    let ret = spawn_blocking(move || tab.evaluate(&wrapped, false)).await??;

    match ret.value {
        Some(Value::String(s)) => Ok(serde_json::from_str(&s)?),
        Some(value) => anyhow::bail!("not a string: {value}"),
        None => anyhow::bail!("returned nothing"),
    }
}

/// Waits until the document has loaded and no new resource has been requested
/// for a short quiet period.
pub async fn wait_for_network_idle(tab: &Arc<Tab>, limit: Duration) -> anyhow::Result<()> {
    #[derive(Deserialize)]
    struct Load {
        ready: String,
        resources: usize,
    }

    const PROBE: &str = "{ ready: document.readyState, resources: performance.getEntriesByType('resource').length }";

    let wait = async {
        let mut last = None;
        let mut since = Instant::now();
        loop {
            let load: Load = evaluate_json(tab, PROBE).await?;
            if load.ready != "complete" || last != Some(load.resources) {
                last = Some(load.resources);
                since = Instant::now();
            } else if since.elapsed() >= QUIET {
                break anyhow::Ok(());
            }

            sleep(PERIOD).await;
        }
    };

    match timeout(limit, wait).await {
        Ok(r) => r,
        Err(_) => anyhow::bail!("network still busy after {limit:?}"),
    }
}

pub async fn wait_for_async(
    tab: &Arc<Tab>,
    selector: Cow<'static, str>,
    limit: Duration,
) -> anyhow::Result<()> {
    let wait = async {
        loop {
            let arc_tab = tab.clone();
            let css = selector.clone();
            match spawn_blocking(move || arc_tab.find_element(&css).map(|_| ())).await? {
                Ok(()) => break anyhow::Ok(()),
                Err(err) => {
                    if !err.is::<NoElementFound>() {
                        break Err(err);
                    }
                }
            }

            sleep(PERIOD).await;
        }
    };

    // An in-flight find_element keeps running on the blocking pool after this fires.
    match timeout(limit, wait).await {
        Ok(r) => r,
        Err(_) => anyhow::bail!("timed out after {limit:?} waiting for {selector}"),
    }
}

/// Script that picks the `<option>` whose value, label or text equals
/// `label` and fires the events a user selection would.
///
/// Evaluates to `"ok"`, `"missing"` (no such `<select>`) or `"no-option"`.
pub fn select_option_script(selector: &str, label: &str) -> String {
    let selector = Value::from(selector);
    let label = Value::from(label);

    format!(
        r#"(() => {{
    const select = document.querySelector({selector});
    if (select === null) return "missing";
    const label = {label};
    const option = Array.from(select.options).find(o => o.value === label || o.label === label || o.text.trim() === label);
    if (option === undefined) return "no-option";
    select.value = option.value;
    select.dispatchEvent(new Event("input", {{ bubbles: true }}));
    select.dispatchEvent(new Event("change", {{ bubbles: true }}));
    return "ok";
}})()"#
    )
}

/// Selects `label` in the dropdown at `selector`, waiting for the option to
/// be populated.
pub async fn select_option(
    tab: &Arc<Tab>,
    selector: &str,
    label: &str,
    limit: Duration,
) -> anyhow::Result<()> {
    let script = select_option_script(selector, label);

    let wait = async {
        loop {
            let outcome: String = evaluate_json(tab, &script).await?;
            if outcome == "ok" {
                break anyhow::Ok(());
            }
            tracing::debug!(target: "select", "{selector} -> {label:?}: {outcome}");

            sleep(PERIOD).await;
        }
    };

    match timeout(limit, wait).await {
        Ok(r) => r,
        Err(_) => anyhow::bail!("no option {label:?} in {selector} after {limit:?}"),
    }
}

pub async fn page_content(tab: &Arc<Tab>) -> anyhow::Result<String> {
    let tab = tab.clone();

    spawn_blocking(move || tab.get_content()).await?
}
