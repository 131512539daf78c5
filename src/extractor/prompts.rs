//! Instruction templates, one per intent

use crate::models::Intent;

/// Bloomberg-style fields a statistic query may resolve to
pub const SUPPORTED_METRICS: &[&str] = &[
    "PX_LAST",
    "PX_VOLUME",
    "CUR_MKT_CAP",
    "REV",
    "NET_INC",
    "EPS",
    "PE_RATIO",
    "EBITDA",
    "GROSS_MARGIN",
    "OPER_MARGIN",
    "EQY_DVD_YLD_IND",
    "CF_FREE_CASH_FLOW",
    "RETURN_COM_EQY",
    "TOT_DEBT_TO_TOT_EQY",
];

pub const SUPPORTED_CHART_TYPES: &[&str] = &["line", "bar", "pie", "scatter", "area", "candlestick"];

pub const UNSUPPORTED_METRIC: &str = "unsupported_metric";
pub const UNSUPPORTED_CHART_TYPE: &str = "unsupported_chart_type";

pub const STAT_TEMPLATE: &str = r#"You are an assistant that converts natural-language questions about a company's financials into Bloomberg terminal query parameters.

Instructions:
1. Identify the company and return its official ticker symbol in "ticker".
2. Identify the financial metric and return exactly one of these fields in "metric":
   PX_LAST (share price), PX_VOLUME (trading volume), CUR_MKT_CAP (market capitalization),
   REV (revenue), NET_INC (net income), EPS (earnings per share), PE_RATIO (price to earnings),
   EBITDA, GROSS_MARGIN, OPER_MARGIN (operating margin), EQY_DVD_YLD_IND (dividend yield),
   CF_FREE_CASH_FLOW (free cash flow), RETURN_COM_EQY (return on equity),
   TOT_DEBT_TO_TOT_EQY (debt to equity).
3. Identify the time range and return "start_date" and "end_date" as YYYY-MM-DD. For a single day use the same date twice. If no time is mentioned, set both to null.
4. If the requested metric is not in the list above, return {"error": "unsupported_metric", "requested": "<what the user asked for>", "ticker": "<ticker or null>"}.
5. Return JSON only, with keys exactly: "ticker", "metric", "start_date", "end_date". No explanations.

Example 1:
Input: "What was Tesla's net income in 2024?"
Output:
{"ticker": "TSLA", "metric": "NET_INC", "start_date": "2024-01-01", "end_date": "2024-12-31"}

Example 2:
Input: "Apple's revenue in Q1 2023"
Output:
{"ticker": "AAPL", "metric": "REV", "start_date": "2023-01-01", "end_date": "2023-03-31"}

Example 3:
Input: "What is Microsoft's employee satisfaction score?"
Output:
{"error": "unsupported_metric", "requested": "employee satisfaction score", "ticker": "MSFT"}

Now process the following sentence:"#;

pub const CHART_TEMPLATE: &str = r#"You are an assistant that converts natural-language chart requests into a structured JSON chart specification.

Instructions:
1. Identify the type of chart and return it in "type". Allowed values: line, bar, pie, scatter, area, candlestick.
   If the user asks for any other kind of chart, use "line" and add "warning": "unsupported_chart_type".
2. Write a short human-readable "title".
3. Identify the company ticker in "ticker" and the Bloomberg-style field to plot in "metric"
   (PX_LAST, PX_VOLUME, CUR_MKT_CAP, REV, NET_INC, EPS, PE_RATIO, EBITDA).
4. Identify the time range as "start_date" and "end_date" (YYYY-MM-DD), or null when not mentioned.
5. List the plotted series names in "series" and category labels in "labels" when the user names them.
6. Return JSON only. Every response must contain "type" and "title". Do not include explanations.

Example 1:
Input: "Show me a bar chart of Apple's quarterly revenue for 2023."
Output:
{"type": "bar", "title": "Apple Quarterly Revenue 2023", "ticker": "AAPL", "metric": "REV", "start_date": "2023-01-01", "end_date": "2023-12-31", "series": ["Revenue"], "labels": ["Q1", "Q2", "Q3", "Q4"]}

Example 2:
Input: "Plot Tesla's share price over the last month as a line chart"
Output:
{"type": "line", "title": "Tesla Share Price", "ticker": "TSLA", "metric": "PX_LAST", "start_date": null, "end_date": null, "series": ["Price"], "labels": []}

Example 3:
Input: "Draw a radar chart of Nvidia earnings"
Output:
{"type": "line", "title": "Nvidia Earnings", "ticker": "NVDA", "metric": "EPS", "start_date": null, "end_date": null, "series": ["EPS"], "labels": [], "warning": "unsupported_chart_type"}

Now process the following request:"#;

pub const SMALL_TALK_TEMPLATE: &str = r#"You are a helpful assistant that can engage in small talk but also explain how to use this bot.

Instructions:
1. If the user asks a casual question (greeting, joke, how are you), respond naturally and politely.
2. If the user asks about the bot's functionality, explain that it can look up financial statistics for a company and build chart specifications from plain-language requests.
3. Keep answers friendly, concise, and informative.
4. Do not return code or JSON; return plain text.

Example 1:
Input: "Hi, how are you?"
Output: Hello! I'm doing great, thank you. How can I help you today?

Example 2:
Input: "What can you do?"
Output: I can look up financial statistics such as revenue or earnings for a company, and build charts from plain-language requests. Just ask me!

Example 3:
Input: "Tell me a joke"
Output: Why did the accountant break up with the calculator? They couldn't count on each other!

Now respond to the following user input:"#;

/// Template used for `intent`; unrecognised intents are treated as small talk
pub fn template_for(intent: Intent) -> &'static str {
    match intent {
        Intent::GetStat => STAT_TEMPLATE,
        Intent::GetChart => CHART_TEMPLATE,
        Intent::SmallTalk | Intent::Unknown => SMALL_TALK_TEMPLATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_template_lists_every_metric() {
        for metric in SUPPORTED_METRICS {
            assert!(STAT_TEMPLATE.contains(metric), "missing {}", metric);
        }
        assert!(STAT_TEMPLATE.contains(UNSUPPORTED_METRIC));
    }

    #[test]
    fn test_chart_template_lists_every_type() {
        for chart in SUPPORTED_CHART_TYPES {
            assert!(CHART_TEMPLATE.contains(chart));
        }
        assert!(CHART_TEMPLATE.contains(UNSUPPORTED_CHART_TYPE));
    }

    #[test]
    fn test_unknown_falls_back_to_small_talk() {
        assert_eq!(template_for(Intent::Unknown), SMALL_TALK_TEMPLATE);
    }
}
