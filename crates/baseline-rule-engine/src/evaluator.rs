//! 条件评估器
//!
//! 实现比较操作符的评估逻辑。评估永远不会返回错误：字段缺失、
//! 数值转换失败或容器类型不支持时一律视为不匹配。

use crate::operators::ComparisonOperator;
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `field_value` - 从建筑规格中获取的字段值
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的期望值
    pub fn evaluate(
        field_value: Option<&Value>,
        operator: ComparisonOperator,
        expected_value: &Value,
    ) -> bool {
        let field_value = match field_value {
            Some(Value::Null) | None => return false,
            Some(v) => v,
        };

        match operator {
            ComparisonOperator::Equals => Self::eq(field_value, expected_value),
            ComparisonOperator::NotEquals => !Self::eq(field_value, expected_value),
            op if op.is_ordering() => Self::compare(field_value, expected_value, op),
            ComparisonOperator::In => Self::membership(field_value, expected_value).unwrap_or(false),
            ComparisonOperator::NotIn => Self::membership(field_value, expected_value)
                .map(|found| !found)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// 相等比较
    ///
    /// 两侧都是数字时按浮点值比较（15000 与 15000.0 相等），其余类型直接比较，不做字符串转换。
    fn eq(field: &Value, expected: &Value) -> bool {
        if let (Value::Number(a), Value::Number(b)) = (field, expected) {
            if let (Some(f1), Some(f2)) = (a.as_f64(), b.as_f64()) {
                return f1 == f2;
            }
        }

        field == expected
    }

    /// 数值比较，任一侧无法转换为数值时返回 false
    fn compare(field: &Value, expected: &Value, operator: ComparisonOperator) -> bool {
        let (Some(a), Some(b)) = (Self::as_f64(field), Self::as_f64(expected)) else {
            return false;
        };

        match operator {
            ComparisonOperator::GreaterThan => a > b,
            ComparisonOperator::LessThan => a < b,
            ComparisonOperator::GreaterThanOrEqual => a >= b,
            ComparisonOperator::LessThanOrEqual => a <= b,
            _ => false,
        }
    }

    /// 容器成员检查
    ///
    /// - 数组：任一元素与字段值相等
    /// - 字符串：按字符检查，字段值必须恰好是容器中的某一个字符（不是子串匹配）
    /// - 对象：字段值是否为其中的键
    ///
    /// 其他容器类型返回 `None`，`in` 和 `not_in` 都按不匹配处理。
    fn membership(field: &Value, container: &Value) -> Option<bool> {
        match container {
            Value::Array(items) => Some(items.iter().any(|item| Self::eq(field, item))),
            Value::String(s) => {
                let needle = field.as_str()?;
                let mut chars = needle.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(s.chars().any(|candidate| candidate == c)),
                    _ => Some(false),
                }
            }
            Value::Object(map) => Some(field.as_str().is_some_and(|key| map.contains_key(key))),
            _ => None,
        }
    }

    /// 尝试将 Value 转换为 f64
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(field: Value, operator: ComparisonOperator, expected: Value) -> bool {
        ConditionEvaluator::evaluate(Some(&field), operator, &expected)
    }

    #[test]
    fn test_equals() {
        assert!(eval(json!("office"), ComparisonOperator::Equals, json!("office")));
        assert!(!eval(json!("retail"), ComparisonOperator::Equals, json!("office")));
        assert!(eval(json!(15000), ComparisonOperator::Equals, json!(15000.0)));
        assert!(!eval(json!("15000"), ComparisonOperator::Equals, json!(15000)));
    }

    #[test]
    fn test_not_equals() {
        assert!(eval(json!("retail"), ComparisonOperator::NotEquals, json!("office")));
        assert!(!eval(json!("office"), ComparisonOperator::NotEquals, json!("office")));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(eval(json!(15000), ComparisonOperator::GreaterThan, json!(10000)));
        assert!(!eval(json!(5000), ComparisonOperator::GreaterThan, json!(10000)));
        assert!(eval(json!(100), ComparisonOperator::GreaterThanOrEqual, json!(100)));
        assert!(eval(json!(50), ComparisonOperator::LessThan, json!(100)));
        assert!(eval(json!(100.0), ComparisonOperator::LessThanOrEqual, json!(100)));
        assert!(eval(json!("25000"), ComparisonOperator::LessThan, json!(30000)));
    }

    #[test]
    fn test_bool_and_trimmed_string_coercion() {
        assert!(eval(json!(true), ComparisonOperator::GreaterThan, json!(0)));
        assert!(!eval(json!(false), ComparisonOperator::GreaterThanOrEqual, json!(1)));
        assert!(eval(json!(false), ComparisonOperator::LessThan, json!(true)));
        assert!(eval(json!(" 42 "), ComparisonOperator::GreaterThanOrEqual, json!(42)));
    }

    #[test]
    fn test_numeric_coercion_failure_is_false() {
        assert!(!eval(json!("not-a-number"), ComparisonOperator::GreaterThan, json!(10000)));
        assert!(!eval(json!(15000), ComparisonOperator::LessThan, json!("abc")));
        assert!(!eval(json!([1]), ComparisonOperator::GreaterThanOrEqual, json!(0)));
    }

    #[test]
    fn test_in_list() {
        let zones = json!(["1a", "1b", "2a", "2b"]);
        assert!(eval(json!("2a"), ComparisonOperator::In, zones.clone()));
        assert!(!eval(json!("5a"), ComparisonOperator::In, zones.clone()));
        assert!(eval(json!("5a"), ComparisonOperator::NotIn, zones));
    }

    #[test]
    fn test_in_string_is_character_membership() {
        // 字符串容器按字符检查，而不是子串
        assert!(eval(json!("f"), ComparisonOperator::In, json!("office")));
        assert!(!eval(json!("off"), ComparisonOperator::In, json!("office")));
        assert!(!eval(json!("office"), ComparisonOperator::In, json!("office")));
        assert!(eval(json!("off"), ComparisonOperator::NotIn, json!("office")));
        assert!(!eval(json!("x"), ComparisonOperator::In, json!("office")));
    }

    #[test]
    fn test_in_unsupported_container_is_false() {
        assert!(!eval(json!(1), ComparisonOperator::In, json!(1)));
        assert!(!eval(json!(1), ComparisonOperator::NotIn, json!(1)));
        assert!(!eval(json!(1), ComparisonOperator::In, json!("123")));
    }

    #[test]
    fn test_missing_field() {
        assert!(!ConditionEvaluator::evaluate(None, ComparisonOperator::Equals, &json!("test")));
        assert!(!ConditionEvaluator::evaluate(None, ComparisonOperator::NotEquals, &json!("test")));
        assert!(!ConditionEvaluator::evaluate(
            Some(&json!(null)),
            ComparisonOperator::NotIn,
            &json!(["a"])
        ));
    }
}
