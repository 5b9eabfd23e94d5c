//! Sina Finance endpoints and symbol conventions.

pub const KLINE_URL: &str =
    "https://money.finance.sina.com.cn/quotes_service/api/json_v2.php/CN_MarketData.getKLineData";
pub const QUOTE_URL: &str = "https://hq.sinajs.cn/list=";
pub const STOCK_LIST_URL: &str = "https://money.finance.sina.com.cn/corp/view/vIE_AllStockSelect.php";
pub const FUND_LIST_URL: &str = "https://money.finance.sina.com.cn/fund/view/vF_AllFundSelect.php";
pub const SUGGEST_URL: &str = "https://suggest3.sinajs.cn/suggest/type=11,12,13,14,15&key=";

/// Most bars the K-line endpoint is asked for.
pub const KLINE_MAX_BARS: usize = 1000;

/// Exchange prefix for an A-share code: `sh` for 6/9, `sz` for 0/3.
pub fn market_of(code: &str) -> Option<&'static str> {
    match code.chars().next()? {
        '6' | '9' => Some("sh"),
        '0' | '3' => Some("sz"),
        _ => None,
    }
}

/// `600000` → `sh600000`. Codes with no known market, or already
/// prefixed, pass through.
pub fn format_symbol(symbol: &str) -> String {
    let symbol = symbol.trim();
    match market_of(symbol) {
        Some(market) => format!("{}{}", market, symbol),
        None => symbol.to_string(),
    }
}

/// K-line `scale` in minutes for a bar period.
pub fn kline_scale(period: &str) -> &'static str {
    match period {
        "weekly" => "1200",
        "monthly" => "7200",
        _ => "240",
    }
}
