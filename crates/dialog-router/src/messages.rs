use agent_core::{Conditions, Metric, QueryParameters, RankOrder, Task};
use chrono::NaiveDate;

/// Formats a float with up to two decimals, dropping a trailing `.00`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.2}")
    }
}

pub fn metric_unit(metric: Metric) -> &'static str {
    match metric {
        Metric::Close | Metric::Open | Metric::High | Metric::Low | Metric::Price | Metric::Turnover => "원",
        Metric::Volume => "주",
        Metric::PctChange | Metric::AscendRate | Metric::DescendRate => "%",
        _ => "",
    }
}

pub fn metric_korean_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Close => "종가",
        Metric::Open => "시가",
        Metric::High => "고가",
        Metric::Low => "저가",
        Metric::Volume => "거래량",
        Metric::PctChange => "등락률",
        Metric::Index => "지수",
        Metric::Turnover => "거래대금",
        Metric::AscendRate => "상승률",
        Metric::DescendRate => "하락률",
        Metric::Price => "주가",
        Metric::Volatility => "변동성",
        Metric::Beta => "베타",
        Metric::ThreeWhite => "상승 3봉",
        Metric::ThreeBlack => "하락 3봉",
        Metric::Rsi => "RSI",
        Metric::Bollinger => "볼린저 밴드",
        Metric::MovingAvg => "이동평균",
        Metric::VolumeSpike => "거래량 급증",
    }
}

pub fn holiday_message(date: NaiveDate) -> String {
    format!("{date}는 휴장일입니다. 데이터가 없습니다.")
}

pub fn data_unavailable_message(date: NaiveDate) -> String {
    format!("{date}에 대한 데이터가 없습니다.")
}

pub fn could_not_understand_message() -> String {
    "질문을 이해하지 못했습니다. 다시 말씀해 주시겠어요?".to_string()
}

pub fn simple_lookup_answer(date: NaiveDate, ticker_name: &str, metric: Metric, value: f64) -> String {
    format!(
        "{date}에 {ticker_name}의 {}은(는) {}{} 입니다.",
        metric_korean_name(metric),
        format_number(value),
        metric_unit(metric)
    )
}

pub fn rank_list_answer(names: &[String]) -> String {
    names.join(", ")
}

pub fn count_answer(market_phrase: &str, label: &str, count: usize) -> String {
    format!("{market_phrase} {label}은(는) {count}개 입니다.")
}

pub fn cross_count_answer(count: usize) -> String {
    format!("해당 기간 동안 골든크로스가 발생한 횟수는 {count}번입니다.")
}

pub fn dead_cross_count_answer(count: usize) -> String {
    format!("해당 기간 동안 데드크로스가 발생한 횟수는 {count}번입니다.")
}

pub fn three_pattern_count_answer(count: usize) -> String {
    format!("해당 기간 동안 패턴이 발생한 횟수는 {count}번입니다.")
}

pub fn date_list_answer(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        "해당 기간 동안 발생한 날짜가 없습니다.".to_string()
    } else {
        let joined = dates.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ");
        format!("해당 날짜: {joined}")
    }
}

pub fn stock_search_answer(description: &str, names: &[String]) -> String {
    if names.is_empty() {
        format!("{description} 종목을 찾지 못했습니다.")
    } else {
        format!("{description} 종목: {}", names.join(", "))
    }
}

pub fn crossed_stocks_answer(names: &[String]) -> String {
    if names.is_empty() {
        "해당 기간 동안 크로스가 발생한 종목이 없습니다.".to_string()
    } else {
        format!("해당 종목: {}", names.join(", "))
    }
}

pub fn pattern_stocks_answer(names: &[String]) -> String {
    if names.is_empty() {
        "해당 기간 동안 패턴이 발생한 종목이 없습니다.".to_string()
    } else {
        format!("해당 종목: {}", names.join(", "))
    }
}

pub fn ambiguous_ticker_prompt(alias: &str, candidates: &[String]) -> String {
    format!(
        "종목명 인식에 실패하였습니다. '{alias}'과(와) 비슷한 종목: {} 중 어느 것을 말씀하시는 건가요?",
        candidates.join(", ")
    )
}

fn known_date_phrase(params: &QueryParameters) -> String {
    match params.date {
        Some(date) => format!("{date}에"),
        None => String::new(),
    }
}

fn known_ticker_phrase(params: &QueryParameters) -> String {
    if params.tickers.is_empty() {
        String::new()
    } else {
        format!("{}의", params.tickers.join(", "))
    }
}

/// Interpolates whatever is already known into a single coherent sentence,
/// e.g. "2024-12-01에 삼성전자의 어떤 지표를 알려 드릴까요?" — never a bare
/// slot-name list.
pub fn simple_lookup_prompt(params: &QueryParameters, missing: &std::collections::BTreeSet<String>) -> String {
    let date_phrase = known_date_phrase(params);
    let ticker_phrase = known_ticker_phrase(params);

    if missing.contains("tickers") {
        return format!("{date_phrase} 어떤 종목에 대해 알려 드릴까요?").trim_start().to_string();
    }
    if missing.contains("market") {
        return "어느 시장(KOSPI/KOSDAQ) 지수를 말씀하시는 건가요?".to_string();
    }
    if missing.contains("metrics") {
        let parts: Vec<&str> = [date_phrase.as_str(), ticker_phrase.as_str()].iter().copied().filter(|s| !s.is_empty()).collect();
        return format!("{} 어떤 지표를 알려 드릴까요?", parts.join(" ")).trim_start().to_string();
    }
    format!("{date_phrase} 날짜를 알려주시겠어요?").trim_start().to_string()
}

pub fn market_rank_prompt(params: &QueryParameters, missing: &std::collections::BTreeSet<String>) -> String {
    if missing.contains("order") {
        return "가장 높은 종목을 원하시나요, 가장 낮은 종목을 원하시나요?".to_string();
    }
    if missing.contains("metrics") {
        return "어떤 지표로 순위를 매겨 드릴까요?".to_string();
    }
    "날짜를 알려주시겠어요?".to_string()
}

pub fn count_prompt() -> String {
    "날짜를 알려주시겠어요?".to_string()
}

pub fn count_date_search_prompt(missing: &std::collections::BTreeSet<String>) -> String {
    if missing.contains("tickers") {
        "어느 종목에 대해 알려 드릴까요?".to_string()
    } else if missing.contains("conditions") {
        "골든크로스/데드크로스나 캔들 패턴 중 어느 것을 찾으시나요?".to_string()
    } else {
        "조회할 기간(시작일~종료일)을 알려주시겠어요?".to_string()
    }
}

fn range_clause(label: &str, range: agent_core::Range) -> Option<String> {
    match (range.min, range.max) {
        (Some(min), Some(max)) => Some(format!("{label} {}~{} 사이인", format_number(min), format_number(max))),
        (Some(min), None) => Some(format!("{label} {} 이상인", format_number(min))),
        (None, Some(max)) => Some(format!("{label} {} 이하인", format_number(max))),
        (None, None) => None,
    }
}

/// Assembles the Korean description of the satisfied `conditions` leaves
/// in the fixed leaf order: pct_change, pct_change_range, consecutive_change,
/// volume_pct, volume, price_close, then the remaining single-day leaves.
pub fn conditions_description(conditions: &Conditions) -> String {
    let mut clauses = Vec::new();

    if let Some(range) = conditions.pct_change {
        if let Some(c) = range_clause("등락률이", range) {
            clauses.push(c);
        }
    }
    if let Some(range) = conditions.pct_change_range {
        if let Some(c) = range_clause("누적 등락률이", range) {
            clauses.push(c);
        }
    }
    if let Some(direction) = conditions.consecutive_change {
        let word = match direction {
            agent_core::ConsecutiveDirection::Up => "상승",
            agent_core::ConsecutiveDirection::Down => "하락",
        };
        clauses.push(format!("연속으로 {word}한"));
    }
    if let Some(range) = conditions.volume_pct {
        if let Some(c) = range_clause("거래량 증감률이", range) {
            clauses.push(c);
        }
    }
    if let Some(range) = conditions.volume {
        if let Some(c) = range_clause("거래량이", range) {
            clauses.push(c);
        }
    }
    if let Some(range) = conditions.price_close {
        if let Some(c) = range_clause("종가가", range) {
            clauses.push(c);
        }
    }
    if let Some(range) = conditions.gap_pct {
        if let Some(c) = range_clause("갭 비율이", range) {
            clauses.push(c);
        }
    }
    if let Some(rsi) = conditions.rsi {
        if let Some(c) = range_clause("RSI가", rsi.range) {
            clauses.push(c);
        }
    }
    if conditions.volume_spike.is_some() {
        clauses.push("거래량이 급증한".to_string());
    }
    if conditions.moving_avg.is_some() {
        clauses.push("이동평균을 이탈한".to_string());
    }
    if let Some(band) = conditions.bollinger_touch {
        let word = match band {
            agent_core::BollingerBand::Upper => "상단",
            agent_core::BollingerBand::Lower => "하단",
        };
        clauses.push(format!("볼린저 밴드 {word}에 닿은"));
    }
    if conditions.peak_break.is_some() {
        clauses.push("신고가를 기록한".to_string());
    }
    if conditions.peak_low.is_some() {
        clauses.push("신저가를 기록한".to_string());
    }
    if conditions.off_peak.is_some() {
        clauses.push("고점 대비 하락한".to_string());
    }

    if clauses.is_empty() {
        "조건에 맞는".to_string()
    } else {
        format!("{}", clauses.join(" 및 "))
    }
}

/// Returns a prompt interleaving the filled description with the still-open
/// holes, so the user sees their partial understanding restated.
pub fn stock_search_prompt(conditions: &Conditions, missing: &std::collections::BTreeSet<String>) -> String {
    let description = conditions_description(conditions);
    if missing.contains("conditions") {
        return "어떤 조건으로 종목을 찾아 드릴까요?".to_string();
    }
    if missing.iter().any(|m| m.starts_with("date")) {
        return format!("{description} 종목을 찾으려면 날짜(또는 기간)가 필요해요. 언제인가요?");
    }
    format!("{description} 종목 조건 중 {}이(가) 더 필요해요.", missing.iter().cloned().collect::<Vec<_>>().join(", "))
}

pub fn rank_order_from_task(params: &QueryParameters) -> RankOrder {
    params.conditions.order.unwrap_or(RankOrder::High)
}

pub fn is_single_day_task(task: Task) -> bool {
    matches!(task, Task::SimpleLookup | Task::MarketRank | Task::AdvancersCount | Task::DeclinersCount | Task::TradedCount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_numbers_without_decimals() {
        assert_eq!(format_number(71500.0), "71500");
    }

    #[test]
    fn formats_fractional_values_with_two_decimals() {
        assert_eq!(format_number(3.14159), "3.14");
    }

    #[test]
    fn empty_conditions_falls_back_to_generic_phrase() {
        assert_eq!(conditions_description(&Conditions::default()), "조건에 맞는");
    }
}
