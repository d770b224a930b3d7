//! Text rendering for scan results and risk metrics.

#![allow(clippy::format_push_string)]

use spread_scan_arbitrage::{ScanSummary, ValidatedCandidate};
use spread_scan_core::ExchangeId;
use spread_scan_exchanges::trade_url;
use spread_scan_risk::RiskMetricsResult;

const HEADERS: [&str; 13] = [
    "#", "Symbol", "Buy", "Sell", "Volume", "Cost", "Revenue", "Profit", "Profit %", "Buy Vol",
    "Sell Vol", "R/R", "Depth",
];

// =============================================================================
// Opportunities
// =============================================================================

/// Ranked opportunities as a box-drawn table followed by trade links.
#[must_use]
pub fn opportunities_table(opportunities: &[ValidatedCandidate]) -> String {
    if opportunities.is_empty() {
        return "No opportunities found".to_string();
    }

    let rows: Vec<Vec<String>> = opportunities
        .iter()
        .enumerate()
        .map(|(i, opp)| {
            let c = &opp.candidate;
            vec![
                (i + 1).to_string(),
                c.symbol.clone(),
                c.buy_exchange.to_string(),
                c.sell_exchange.to_string(),
                format!("{:.4}", c.volume),
                format!("{:.2}", c.cost),
                format!("{:.2}", c.revenue),
                format!("{:.2}", c.profit),
                format!("{:.2}%", c.profit_pct),
                format_metric(opp.buy_metrics.volatility),
                format_metric(opp.sell_metrics.volatility),
                format_ratio(opp.reward_risk_ratio()),
                format!("{:.4}", c.depth),
            ]
        })
        .collect();

    let mut output = table(&HEADERS, &rows);
    output.push('\n');
    for (i, opp) in opportunities.iter().enumerate() {
        let c = &opp.candidate;
        output.push_str(&format!(
            "{:>3}. {} buy: {}\n     {} sell: {}\n",
            i + 1,
            c.symbol,
            link(c.buy_exchange, &c.symbol),
            " ".repeat(c.symbol.chars().count()),
            link(c.sell_exchange, &c.symbol),
        ));
    }
    output
}

fn link(exchange: ExchangeId, symbol: &str) -> String {
    trade_url(exchange, symbol).unwrap_or_else(|| format!("{exchange} (no link)"))
}

fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r == f64::INFINITY => "inf".to_string(),
        Some(r) if r == f64::NEG_INFINITY => "-inf".to_string(),
        Some(r) => format!("{r:.2}"),
        None => "n/a".to_string(),
    }
}

/// One-line cycle summary.
#[must_use]
pub fn summary_line(cycle: u64, summary: &ScanSummary) -> String {
    let mut line = format!(
        "Cycle {cycle} @ {} | exchanges: {} ok, {} failed | common symbols: {} | spreads: {} | validated: {} | shown: {} | {} ms",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.exchanges_ok.len(),
        summary.exchanges_failed.len(),
        summary.common_symbols,
        summary.stage1_candidates,
        summary.stage2_validated,
        summary.ranked,
        summary.elapsed_ms,
    );
    if summary.history_failures > 0 || summary.depth_failures > 0 {
        line.push_str(&format!(
            "\n  missing histories: {} | missing order books: {}",
            summary.history_failures, summary.depth_failures
        ));
    }
    if !summary.exchanges_failed.is_empty() {
        let failed: Vec<String> = summary
            .exchanges_failed
            .iter()
            .map(|(exchange, reason)| format!("{exchange}: {reason}"))
            .collect();
        line.push_str(&format!("\n  failed: {}", failed.join("; ")));
    }
    line
}

// =============================================================================
// Metrics
// =============================================================================

/// Every risk metric for one symbol, one per line.
#[must_use]
pub fn metrics_report(
    exchange: ExchangeId,
    symbol: &str,
    samples: usize,
    metrics: &RiskMetricsResult,
) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("═══════════════════════════════════════════════════════════════\n");
    output.push_str(&format!("  RISK METRICS  {symbol} on {exchange}\n"));
    output.push_str("═══════════════════════════════════════════════════════════════\n");
    output.push_str(&format!("Samples:               {samples}\n"));
    output.push_str("───────────────────────────────────────────────────────────────\n");

    for (name, value) in metrics.fields() {
        output.push_str(&format!("{:<22} {}\n", format!("{}:", label(name)), format_metric(value)));
    }

    if metrics.is_undefined() {
        output.push_str("\nNot enough usable history to compute metrics.\n");
    }
    output.push_str("═══════════════════════════════════════════════════════════════\n");
    output
}

fn label(field: &str) -> &str {
    match field {
        "volatility" => "Volatility",
        "sharpe" => "Sharpe Ratio",
        "sortino" => "Sortino Ratio",
        "var" => "VaR (95%)",
        "cvar" => "CVaR (95%)",
        "max_drawdown" => "Max Drawdown",
        "calmar" => "Calmar Ratio",
        "omega" => "Omega Ratio",
        "hurst_exponent" => "Hurst Exponent",
        "fractal_dimension" => "Fractal Dimension",
        other => other,
    }
}

fn format_metric(value: f64) -> String {
    if value.is_nan() {
        "undefined".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value:.4}")
    }
}

// =============================================================================
// Table
// =============================================================================

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = rule(&widths, "┌", "┬", "┐");
    output.push_str(&table_row(&widths, headers));
    output.push_str(&rule(&widths, "├", "┼", "┤"));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        output.push_str(&table_row(&widths, &cells));
    }
    output.push_str(&rule(&widths, "└", "┴", "┘"));
    output
}

fn rule(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}\n", segments.join(mid))
}

fn table_row(widths: &[usize], cells: &[&str]) -> String {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| format!(" {:<w$} ", cells.get(i).copied().unwrap_or(""), w = *w))
        .collect();
    format!("│{}│\n", padded.join("│"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use spread_scan_arbitrage::SpreadCandidate;

    fn opportunity() -> ValidatedCandidate {
        ValidatedCandidate {
            candidate: SpreadCandidate {
                symbol: "BTCUSDT".to_string(),
                buy_exchange: ExchangeId::Binance,
                sell_exchange: ExchangeId::Okx,
                buy_price: dec!(101),
                sell_price: dec!(105),
                volume: dec!(50),
                cost: dec!(5050),
                revenue: dec!(5250),
                profit: dec!(200),
                profit_pct: dec!(3.9604),
                reward_risk_ratio: Some(f64::INFINITY),
                depth: dec!(50),
            },
            buy_metrics: RiskMetricsResult {
                volatility: 0.25,
                ..RiskMetricsResult::undefined()
            },
            sell_metrics: RiskMetricsResult::undefined(),
        }
    }

    // ==================== Table Tests ====================

    #[test]
    fn test_empty_results() {
        assert_eq!(opportunities_table(&[]), "No opportunities found");
    }

    #[test]
    fn test_table_rows_and_links() {
        let output = opportunities_table(&[opportunity()]);

        assert!(output.starts_with('┌'));
        assert!(output.contains("BTCUSDT"));
        assert!(output.contains("5050.00"));
        assert!(output.contains("3.96%"));
        assert!(output.contains("inf"));
        assert!(output.contains("Sell Vol"));
        assert!(output.contains("0.2500"));
        assert!(output.contains("undefined"));
        assert!(output.contains("https://www.binance.com/en/trade/BTC_USDT?type=spot"));
        assert!(output.contains("https://www.okx.com/en/trade-spot/btc-usdt"));
    }

    #[test]
    fn test_table_lines_have_equal_width() {
        let rows = vec![
            vec!["1".to_string(), "a-very-long-cell".to_string()],
            vec!["22".to_string(), "b".to_string()],
        ];
        let output = table(&["#", "Name"], &rows);
        let widths: Vec<usize> = output.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(output.lines().count(), 6);
    }

    #[test]
    fn test_ratio_formatting() {
        assert_eq!(format_ratio(None), "n/a");
        assert_eq!(format_ratio(Some(1.234)), "1.23");
        assert_eq!(format_ratio(Some(f64::NEG_INFINITY)), "-inf");
    }

    // ==================== Summary Tests ====================

    #[test]
    fn test_summary_lists_failed_exchanges() {
        let summary = ScanSummary {
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            exchanges_ok: vec![ExchangeId::Binance, ExchangeId::Okx],
            exchanges_failed: vec![(ExchangeId::Htx, "network error: reset".to_string())],
            common_symbols: 12,
            stage1_candidates: 4,
            history_failures: 0,
            stage2_validated: 3,
            ranked: 3,
            depth_failures: 1,
            elapsed_ms: 850,
        };
        let line = summary_line(2, &summary);

        assert!(line.starts_with("Cycle 2 @ 2024-01-01 12:00:00 UTC"));
        assert!(line.contains("2 ok, 1 failed"));
        assert!(line.contains("missing order books: 1"));
        assert!(line.contains("HTX: network error: reset"));
    }

    // ==================== Metrics Tests ====================

    #[test]
    fn test_metrics_report_undefined() {
        let output = metrics_report(ExchangeId::Bybit, "ETHUSDT", 1, &RiskMetricsResult::undefined());
        assert!(output.contains("ETHUSDT on Bybit"));
        assert!(output.contains("Samples:               1"));
        assert_eq!(output.matches("undefined").count(), 10);
        assert!(output.contains("Not enough usable history"));
    }

    #[test]
    fn test_metric_formatting() {
        assert_eq!(format_metric(0.123_456), "0.1235");
        assert_eq!(format_metric(f64::INFINITY), "inf");
        assert_eq!(format_metric(f64::NAN), "undefined");
    }
}
