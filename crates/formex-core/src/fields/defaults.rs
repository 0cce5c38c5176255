//! Built-in field table for the U+ service enrollment form.

use super::patterns::*;
use super::rule::{FieldRuleConfig, MatchPolicy, ValueKind};
use super::table::{FieldTableConfig, SectionConfig};

/// Region name of the footer strip holding the submitting agent.
pub const FOOTER_REGION: &str = "footer";

/// Region name of the colored label carrying the customer block.
pub const STICKER_REGION: &str = "sticker";

/// Every label printed on the form. A blank label followed by one of these
/// on the next line resolves to absent instead of capturing it.
pub const FORM_LABELS: [&str; 13] = [
    "이름", "전번", "생년", "결합", "주소", "요금제", "약정기간", "단말", "공용단말", "고객희망일",
    "접수자", "판매자", "담당자",
];

/// Service sections as (section name, column prefix, header pattern).
const SERVICE_SECTIONS: [(&str, &str, &str); 4] = [
    ("internet", "인터넷", INTERNET_HEADER),
    ("tv_primary", "TV주", TV_PRIMARY_HEADER),
    ("tv_secondary", "TV부", TV_SECONDARY_HEADER),
    ("smart_home", "스마트홈", SMART_HOME_HEADER),
];

/// Line-count columns printed next to each section header.
const SERVICE_COUNTS: [(&str, &str); 4] = [
    ("U+ 인터넷", INTERNET_COUNT),
    ("U+ TV (주)", TV_PRIMARY_COUNT),
    ("U+ TV (부)", TV_SECONDARY_COUNT),
    ("U+ 스마트홈", SMART_HOME_COUNT),
];

/// The enrollment-form table: customer block, four service sections, page-level lines.
pub fn enrollment_form() -> FieldTableConfig {
    let sections = SERVICE_SECTIONS
        .iter()
        .map(|(name, _, header)| SectionConfig::new(*name, *header))
        .collect();

    // Customer block, read from the sticker. The mask falls back to the full
    // page when no sticker is found.
    let mut rules: Vec<FieldRuleConfig> = vec![
        FieldRuleConfig::new("이름", NAME).policy(MatchPolicy::LastIfAmbiguous),
        FieldRuleConfig::new("전번", PHONE),
        FieldRuleConfig::new("생년", BIRTH),
        FieldRuleConfig::new("결합", BUNDLE),
        FieldRuleConfig::new("주소", ADDRESS),
    ]
    .into_iter()
    .map(|rule| rule.region(STICKER_REGION).rejects(FORM_LABELS).reject("U+"))
    .collect();

    for ((section, prefix, _), (count_name, count_pattern)) in
        SERVICE_SECTIONS.iter().zip(SERVICE_COUNTS.iter())
    {
        rules.push(FieldRuleConfig::new(*count_name, *count_pattern));
        rules.push(
            FieldRuleConfig::new(format!("{}_요금제", prefix), PLAN)
                .section(*section)
                .rejects(FORM_LABELS),
        );
        rules.push(
            FieldRuleConfig::new(format!("{}_약정시작", prefix), CONTRACT_PERIOD)
                .section(*section)
                .kind(ValueKind::Date),
        );
        rules.push(
            FieldRuleConfig::new(format!("{}_약정종료", prefix), CONTRACT_PERIOD)
                .group(2)
                .section(*section)
                .kind(ValueKind::Date),
        );
        rules.push(
            FieldRuleConfig::new(format!("{}_단말", prefix), DEVICE)
                .section(*section)
                .rejects(FORM_LABELS),
        );
    }

    rules.push(
        FieldRuleConfig::new("공용단말", SHARED_DEVICE)
            .policy(MatchPolicy::Last)
            .rejects(FORM_LABELS),
    );
    rules.push(FieldRuleConfig::new("고객희망일", REQUESTED_DATE));
    rules.push(
        FieldRuleConfig::new("접수자", AGENT)
            .region(FOOTER_REGION)
            .policy(MatchPolicy::Last)
            .rejects(FORM_LABELS),
    );

    FieldTableConfig { sections, rules }
}
