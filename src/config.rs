//! Built-in defaults. Each can be overridden at build time through the
//! named environment variable, and at run time through the CLI.

use core::time::Duration;

macro_rules! env_or_default {
    ($name:expr, $default:expr) => {
        if let Some(s) = option_env!($name) {
            s
        } else {
            $default
        }
    };
}

pub const SYMBOL: &str = env_or_default!("OCS_SYMBOL", "NIFTY");
/// Must match the dropdown label exactly.
pub const EXPIRY: &str = env_or_default!("OCS_EXPIRY", "29-Feb-2026");
pub const OUTPUT: &str = env_or_default!("OCS_OUTPUT", "option_chain_data.csv");

/// Top N + bottom N.
pub const ROWS: usize = 5;

pub const FETCH_INTERVAL: Duration = Duration::from_secs(300);
/// Anything faster gets the client throttled by the site.
pub const MIN_FETCH_INTERVAL: Duration = Duration::from_secs(180);
