//! 文本解析使用的有序模式表
//!
//! 每张表都是 (正则, 规范值) 的有序列表，按顺序取第一个命中项。
//! 较长、较具体的写法必须排在与其重叠的较短写法之前。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::operators::ComparisonOperator;

/// 有序模式表，首个命中项胜出
#[derive(Debug)]
pub struct PatternTable<T> {
    entries: Vec<(Regex, T)>,
}

impl<T: Copy> PatternTable<T> {
    /// 所有模式都按大小写不敏感编译
    fn new(patterns: &[(&str, T)]) -> Self {
        let entries = patterns
            .iter()
            .map(|(pattern, value)| {
                let regex = Regex::new(&format!("(?i){}", pattern))
                    .unwrap_or_else(|e| panic!("内置模式 '{}' 无效: {}", pattern, e));
                (regex, *value)
            })
            .collect();
        Self { entries }
    }

    pub fn first_match(&self, text: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 建筑属性名称
pub static PROPERTY_PATTERNS: Lazy<PatternTable<&'static str>> = Lazy::new(|| {
    PatternTable::new(&[
        (r"\bbuilding\s+area", "building_area"),
        (r"\bfloor\s+area", "floor_area"),
        (r"\bclimate\s+zone", "climate_zone"),
        (r"\bbuilding\s+type", "building_type"),
        (r"\bnumber\s+of\s+stories", "num_stories"),
        (r"\blighting\s+power\s+density", "lighting_power_density"),
        (r"\bwindow\s+to\s+wall\s+ratio", "window_to_wall_ratio"),
        (r"\bu-?factor", "u_factor"),
        (r"\br-?value", "r_value"),
        (r"\bshgc", "shgc"),
        (r"\bcop\b", "cop"),
        (r"\befficiency", "efficiency"),
    ])
});

/// 比较操作符写法
pub static OPERATOR_PATTERNS: Lazy<PatternTable<ComparisonOperator>> = Lazy::new(|| {
    PatternTable::new(&[
        (
            r"\bgreater\s+than\s+or\s+equal|>=|\bat\s+least\b",
            ComparisonOperator::GreaterThanOrEqual,
        ),
        (
            r"\bless\s+than\s+or\s+equal|<=|\bat\s+most\b",
            ComparisonOperator::LessThanOrEqual,
        ),
        (r"\bnot\s+equals?\b|\bis\s+not\b|!=", ComparisonOperator::NotEquals),
        (
            r"\bgreater\s+than\b|\bmore\s+than\b|\bexceeds?\b|>",
            ComparisonOperator::GreaterThan,
        ),
        (r"\bless\s+than\b|\bbelow\b|<", ComparisonOperator::LessThan),
        (r"\bequals?\b|\bis\b|=", ComparisonOperator::Equals),
    ])
});

/// 单位写法
///
/// 面积、功率密度、BTU 与百分比允许紧跟数字（如 `10000sqft`）；温度单位不允许，
/// 否则 "zone 4c" 会被误认为摄氏度。
pub static UNIT_PATTERNS: Lazy<PatternTable<&'static str>> = Lazy::new(|| {
    PatternTable::new(&[
        (r"(?:\b|\d)w/\s*sq\.?\s*ft\b|\bwatts?\s+per\s+square\s+foot", "W/sqft"),
        (r"(?:\b|\d)w/\s*sq\.?\s*m\b|\bwatts?\s+per\s+square\s+met(?:er|re)", "W/sqm"),
        (r"(?:\b|\d)sq\.?\s*ft\b|\bsquare\s+f(?:ee|oo)t\b", "sqft"),
        (r"(?:\b|\d)sq\.?\s*m\b|\bsquare\s+met(?:er|re)s?\b", "sqm"),
        (r"°\s*f\b|\bdeg(?:rees)?\s*f\b|\bfahrenheit\b", "degF"),
        (r"°\s*c\b|\bdeg(?:rees)?\s*c\b|\bcelsius\b", "degC"),
        (r"(?:\b|\d)btu", "BTU"),
        (r"(?:\b|\d)percent\b|%", "percent"),
    ])
});

/// 条件与动作之间的分隔词，按表中顺序尝试
pub const ACTION_SEPARATORS: [&str; 4] = [" then ", " set ", " apply ", " use "];

/// 无数值、无引号时识别的取值关键词
pub const VALUE_KEYWORDS: [&str; 3] = ["office", "retail", "residential"];

pub static AND_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\band\b").unwrap());

pub static OR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bor\b").unwrap());

pub static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").unwrap());

pub static QUOTED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).unwrap());

pub static ZONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"zone\s+(\d+[a-z]?)").unwrap());

pub static METHOD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:method|procedure)\s+([a-z0-9_-]+)").unwrap());

pub static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"table\s+([a-z0-9_.-]+)").unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_table_order() {
        assert_eq!(PROPERTY_PATTERNS.first_match("Building Area is"), Some("building_area"));
        assert_eq!(PROPERTY_PATTERNS.first_match("the U-factor of"), Some("u_factor"));
        assert_eq!(PROPERTY_PATTERNS.first_match("minimum R value"), None);
        assert_eq!(PROPERTY_PATTERNS.first_match("scope of work"), None);
        // 同时出现时按表顺序取 building_area
        assert_eq!(
            PROPERTY_PATTERNS.first_match("building type and building area"),
            Some("building_area")
        );
    }

    #[test]
    fn test_operator_specific_phrasing_first() {
        let cases = [
            ("is greater than or equal to 5", ComparisonOperator::GreaterThanOrEqual),
            ("is less than or equal to 5", ComparisonOperator::LessThanOrEqual),
            ("is at least 5", ComparisonOperator::GreaterThanOrEqual),
            ("is not office", ComparisonOperator::NotEquals),
            ("is greater than 5", ComparisonOperator::GreaterThan),
            ("exceeds 5", ComparisonOperator::GreaterThan),
            ("is below 5", ComparisonOperator::LessThan),
            ("area >= 5", ComparisonOperator::GreaterThanOrEqual),
            ("area > 5", ComparisonOperator::GreaterThan),
            ("type is office", ComparisonOperator::Equals),
        ];

        for (text, expected) in cases {
            assert_eq!(OPERATOR_PATTERNS.first_match(text), Some(expected), "{}", text);
        }
        assert_eq!(OPERATOR_PATTERNS.first_match("office building"), None);
    }

    #[test]
    fn test_unit_table() {
        assert_eq!(UNIT_PATTERNS.first_match("10000 sqft"), Some("sqft"));
        assert_eq!(UNIT_PATTERNS.first_match("10000 sq. ft."), Some("sqft"));
        assert_eq!(UNIT_PATTERNS.first_match("1.0 W/sq ft"), Some("W/sqft"));
        assert_eq!(UNIT_PATTERNS.first_match("500 square meters"), Some("sqm"));
        assert_eq!(UNIT_PATTERNS.first_match("below 65°F"), Some("degF"));
        assert_eq!(UNIT_PATTERNS.first_match("40 percent"), Some("percent"));
        assert_eq!(UNIT_PATTERNS.first_match("40%"), Some("percent"));
        assert_eq!(UNIT_PATTERNS.first_match("if building type is office"), None);
        assert_eq!(UNIT_PATTERNS.first_match("climate zone 4c"), None);
    }

    #[test]
    fn test_unit_directly_after_number() {
        assert_eq!(UNIT_PATTERNS.first_match("10000sqft"), Some("sqft"));
        assert_eq!(UNIT_PATTERNS.first_match("0.9W/sqft"), Some("W/sqft"));
        assert_eq!(UNIT_PATTERNS.first_match("930sqm"), Some("sqm"));
        assert_eq!(UNIT_PATTERNS.first_match("50000btu/h"), Some("BTU"));
        assert_eq!(UNIT_PATTERNS.first_match("40percent"), Some("percent"));
        // 字母之后仍然不识别
        assert_eq!(UNIT_PATTERNS.first_match("rsqft"), None);
        assert_eq!(UNIT_PATTERNS.first_match("65f"), None);
    }

    #[test]
    fn test_tables_are_populated() {
        assert_eq!(PROPERTY_PATTERNS.len(), 12);
        assert_eq!(OPERATOR_PATTERNS.len(), 6);
        assert!(!UNIT_PATTERNS.is_empty());
    }
}
