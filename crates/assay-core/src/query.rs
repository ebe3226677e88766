//! Search query construction.

use chrono::NaiveDate;

use crate::domain::Topic;

/// Qualifiers appended after the topic to bias the provider toward recent coverage.
const PRICE_TREND: &str = "价格走势";
const LATEST_QUOTES: &str = "最新行情";
const WEEKLY_DRIVERS: &str = "近一周涨跌原因";

/// Format a date the way the query and progress labels show it, e.g. `2025年12月30日`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y年%m月%d日").to_string()
}

/// Build the search query for `topic`.
///
/// With `time_qualified` the query becomes
/// `"{topic} 价格走势 {date} 最新行情 近一周涨跌原因"`; without it the topic
/// is searched as entered.
pub fn build_query(topic: &Topic, date: NaiveDate, time_qualified: bool) -> String {
    if !time_qualified {
        return topic.as_str().to_string();
    }
    format!(
        "{} {} {} {} {}",
        topic,
        PRICE_TREND,
        format_date(date),
        LATEST_QUOTES,
        WEEKLY_DRIVERS
    )
}
