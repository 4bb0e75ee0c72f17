//! 物件 ↔ 树状结构转换：`{name, children}` 形式的标签树
//!
//! 正向：任意 JSON 值转为标签树，叶子为 `键: 值`，阵列节点带 `(array)` 标记。
//! 反向：标签树还原为 JSON 值，叶子值依文字推断为布尔、数字或字符串。
//! 反向时同名键以后者覆盖前者；叶子以第一个冒号切分键值，值内含冒号也照此规则。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::model::cell::parse_number;

/// 阵列节点名称结尾的标记
pub const ARRAY_MARKER: &str = "(array)";

/// 正向转换的默认根键
pub const ROOT_KEY: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.name.ends_with(ARRAY_MARKER)
    }

    /// 依索引路径取得节点（空路径为根）
    pub fn node_at(&self, path: &[usize]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }
}

/// 原始值在标签中的文字形式（字符串不加引号）
fn primitive_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// 正向转换：JSON 值 → 标签树
pub fn to_tree(value: &Value, key: &str) -> TreeNode {
    match value {
        Value::Array(items) => TreeNode::branch(
            format!("{} {}", key, ARRAY_MARKER),
            items
                .iter()
                .enumerate()
                .map(|(i, v)| to_tree(v, &format!("[{}]", i)))
                .collect(),
        ),
        Value::Object(map) => {
            TreeNode::branch(key, map.iter().map(|(k, v)| to_tree(v, k)).collect())
        }
        primitive => TreeNode::leaf(format!("{}: {}", key, primitive_text(primitive))),
    }
}

/// 叶子文字推断：true/false/null、数字，其余保持字符串
pub fn parse_value(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        "" => return Value::String(String::new()),
        _ => {}
    }
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(u) = t.parse::<u64>() {
        return Value::from(u);
    }
    if let Some(f) = parse_number(t) {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Value::from(f as i64);
        }
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

/// 子节点在物件中的键：第一个冒号前的文字，无冒号时为整个名称（去掉阵列标记）
pub fn child_key(name: &str) -> String {
    match name.split_once(':') {
        Some((k, _)) => k.trim().to_string(),
        None => name
            .strip_suffix(&format!(" {}", ARRAY_MARKER))
            .unwrap_or(name)
            .to_string(),
    }
}

/// 反向转换：标签树 → JSON 值
pub fn from_tree(node: &TreeNode) -> Value {
    if node.is_leaf() {
        if let Some((_, v)) = node.name.split_once(':') {
            return parse_value(v.trim());
        }
        if node.is_array() {
            return Value::Array(Vec::new());
        }
        return Value::String(node.name.clone());
    }
    if node.is_array() {
        return Value::Array(node.children.iter().map(from_tree).collect());
    }
    let mut obj = Map::new();
    for child in &node.children {
        obj.insert(child_key(&child.name), from_tree(child));
    }
    Value::Object(obj)
}
