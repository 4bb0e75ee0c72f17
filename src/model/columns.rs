//! 栏位推断：依标题文字决定每一栏的呈现与验证规则

use std::sync::LazyLock;

use regex::Regex;

use crate::model::cell::{parse_number, CellValue};

/// 日期栏固定格式
pub const DATE_FORMAT: &str = "YYYY-MM-DD";

/// 类别栏的候选清单
pub const CATEGORY_CANDIDATES: [&str; 3] = ["在地知識", "學名", "大眾用語"];

static AGE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(年齡|年龄|age)$").expect("年龄标题正则"));
static DATE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(日期|date)$").expect("日期标题正则"));
static CATEGORY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(類別|類别|gender)$").expect("类别标题正则"));
static DATE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("日期值正则"));

/// 数字栏的验证规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericRule {
    /// 空或正整数（推断出的年龄栏）
    PositiveInteger,
    /// 空或任意有限数字（手动新增的数字栏）
    Finite,
}

/// 栏位类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric { rule: NumericRule },
    Date { format: &'static str },
    EnumSingle { candidates: Vec<String>, strict: bool },
    Text,
}

impl ColumnKind {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Numeric { .. } => "numeric",
            ColumnKind::Date { .. } => "date",
            ColumnKind::EnumSingle { .. } => "dropdown",
            ColumnKind::Text => "text",
        }
    }
}

/// 单一栏位的推断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub label: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    /// 验证单元格值；空值在所有类型下都合法
    pub fn validate(&self, value: &CellValue) -> bool {
        if value.is_empty() {
            return true;
        }
        match &self.kind {
            ColumnKind::Numeric { rule } => {
                let n = match value {
                    CellValue::Number(n) => Some(*n),
                    CellValue::Text(s) => parse_number(s),
                    CellValue::Empty => None,
                };
                match (rule, n) {
                    (NumericRule::PositiveInteger, Some(n)) => n.fract() == 0.0 && n > 0.0,
                    (NumericRule::Finite, Some(_)) => true,
                    (_, None) => false,
                }
            }
            ColumnKind::Date { .. } => DATE_VALUE.is_match(&value.to_string()),
            ColumnKind::EnumSingle { candidates, strict } => {
                !strict || candidates.iter().any(|c| *c == value.to_string())
            }
            ColumnKind::Text => true,
        }
    }
}

/// 依标题推断栏位规则；保持顺序，一个标题对应一个结果
pub fn infer_columns<S: AsRef<str>>(headers: &[S]) -> Vec<ColumnSpec> {
    headers.iter().map(|h| infer_column(h.as_ref())).collect()
}

fn infer_column(header: &str) -> ColumnSpec {
    let h = header.trim();
    let kind = if AGE_HEADER.is_match(h) {
        ColumnKind::Numeric {
            rule: NumericRule::PositiveInteger,
        }
    } else if DATE_HEADER.is_match(h) {
        ColumnKind::Date {
            format: DATE_FORMAT,
        }
    } else if CATEGORY_HEADER.is_match(h) {
        ColumnKind::EnumSingle {
            candidates: CATEGORY_CANDIDATES.iter().map(|c| c.to_string()).collect(),
            strict: false,
        }
    } else {
        ColumnKind::Text
    };
    ColumnSpec {
        label: header.to_string(),
        kind,
    }
}

/// 新增栏位时选择的资料类型
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NewColumnKind {
    #[default]
    Text,
    Numeric,
    Date,
    Dropdown { candidates: Vec<String> },
}

impl std::str::FromStr for NewColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(list) = s.strip_prefix("dropdown=") {
            let candidates = list
                .split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(NewColumnKind::Dropdown { candidates });
        }
        match s {
            "text" => Ok(NewColumnKind::Text),
            "numeric" => Ok(NewColumnKind::Numeric),
            "date" => Ok(NewColumnKind::Date),
            "dropdown" => Ok(NewColumnKind::Dropdown { candidates: Vec::new() }),
            other => Err(format!("未知的资料类型: {}（可选 text / numeric / date / dropdown）", other)),
        }
    }
}

/// 新增栏位的设定：名称、类型、每列的预设内容
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewColumnConfig {
    pub name: String,
    pub kind: NewColumnKind,
    pub default_value: CellValue,
}

impl NewColumnConfig {
    pub fn new(name: &str, kind: NewColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default_value: CellValue::Empty,
        }
    }

    pub fn with_default(mut self, value: CellValue) -> Self {
        self.default_value = value;
        self
    }

    pub fn to_spec(&self) -> ColumnSpec {
        let kind = match &self.kind {
            NewColumnKind::Text => ColumnKind::Text,
            NewColumnKind::Numeric => ColumnKind::Numeric {
                rule: NumericRule::Finite,
            },
            NewColumnKind::Date => ColumnKind::Date {
                format: DATE_FORMAT,
            },
            NewColumnKind::Dropdown { candidates } => ColumnKind::EnumSingle {
                candidates: candidates.clone(),
                strict: false,
            },
        };
        ColumnSpec {
            label: self.name.clone(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from_field(s)
    }

    #[test]
    fn test_age_headers_in_any_case() {
        for header in ["年齡", "年龄", "age", "AGE", " Age "] {
            let spec = &infer_columns(&[header])[0];
            assert_eq!(
                spec.kind,
                ColumnKind::Numeric { rule: NumericRule::PositiveInteger },
                "{} 应推断为数字栏",
                header
            );
            assert!(spec.validate(&text("")), "空值应合法");
            assert!(spec.validate(&text("5")), "正整数应合法");
            assert!(spec.validate(&CellValue::Number(20.0)), "数字20应合法");
            assert!(!spec.validate(&text("-1")), "负数应不合法");
            assert!(!spec.validate(&text("3.5")), "小数应不合法");
            assert!(!spec.validate(&text("abc")), "文字应不合法");
            assert!(!spec.validate(&text("0")), "零不是正整数");
        }
    }

    #[test]
    fn test_date_headers() {
        for header in ["日期", "date", "Date"] {
            let spec = &infer_columns(&[header])[0];
            assert_eq!(spec.kind, ColumnKind::Date { format: "YYYY-MM-DD" });
            assert!(spec.validate(&text("")));
            assert!(spec.validate(&text("2025-01-01")));
            assert!(!spec.validate(&text("2025-1-1")));
            assert!(!spec.validate(&text("not-a-date")));
        }
    }

    #[test]
    fn test_category_is_non_strict() {
        let spec = &infer_columns(&["類別"])[0];
        match &spec.kind {
            ColumnKind::EnumSingle { candidates, strict } => {
                assert_eq!(candidates, &vec!["在地知識", "學名", "大眾用語"]);
                assert!(!strict);
            }
            other => panic!("类别栏推断错误: {:?}", other),
        }
        assert!(spec.validate(&text("其他")), "非严格下拉不拒绝清单外的值");
        assert_eq!(infer_columns(&["gender"])[0].kind.name(), "dropdown");
        assert_eq!(infer_columns(&["類别"])[0].kind.name(), "dropdown");
    }

    #[test]
    fn test_unmatched_and_partial_labels_fall_back_to_text() {
        let specs = infer_columns(&["備註", "page", "age group", "birthdate"]);
        assert!(specs.iter().all(|s| s.kind == ColumnKind::Text));
        assert_eq!(specs[1].label, "page");
    }

    #[test]
    fn test_order_and_label_preserved() {
        let specs = infer_columns(&[" date ", "x", "age"]);
        let labels: Vec<&str> = specs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec![" date ", "x", "age"]);
        assert_eq!(specs[0].kind.name(), "date");
        assert_eq!(specs[2].kind.name(), "numeric");
    }

    #[test]
    fn test_configured_numeric_accepts_any_finite_number() {
        let spec = NewColumnConfig::new("分数", "numeric".parse().unwrap()).to_spec();
        assert!(spec.validate(&text("3.5")));
        assert!(spec.validate(&text("-1")));
        assert!(!spec.validate(&text("abc")));
    }

    #[test]
    fn test_dropdown_kind_with_candidates() {
        let kind: NewColumnKind = "dropdown=學名| 大眾用語 |".parse().unwrap();
        assert_eq!(
            kind,
            NewColumnKind::Dropdown { candidates: vec!["學名".into(), "大眾用語".into()] }
        );
    }

    #[test]
    fn test_unknown_new_column_kind() {
        assert!("timestamp".parse::<NewColumnKind>().is_err());
    }
}
