//! 树状大纲：把标签树展平为带深度与索引路径的列，供文字呈现与节点定位

use crate::model::tree::TreeNode;

/// 渲染区预设宽度与每个叶子所占宽度
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 960;
pub const LEAF_SPACING: u32 = 20;
const HORIZONTAL_MARGIN: u32 = 90 + 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    /// 节点标签
    pub name: String,
    /// 索引路径，根为 `$`，子节点为 `$.0.2`
    pub path: String,
    /// 节点深度（用于缩进显示）
    pub depth: u32,
    /// 直接子节点数量
    pub children: u32,
}

impl OutlineRow {
    pub fn is_leaf(&self) -> bool {
        self.children == 0
    }
}

/// 前序展平整棵树
pub fn build_outline(root: &TreeNode) -> Vec<OutlineRow> {
    fn walk(out: &mut Vec<OutlineRow>, node: &TreeNode, path: &str, depth: u32) {
        out.push(OutlineRow {
            name: node.name.clone(),
            path: path.to_string(),
            depth,
            children: node.children.len() as u32,
        });
        for (idx, child) in node.children.iter().enumerate() {
            walk(out, child, &format!("{}.{}", path, idx), depth + 1);
        }
    }

    let mut out = Vec::new();
    walk(&mut out, root, "$", 0);
    out
}

/// 解析 `$.0.2` 形式的索引路径
pub fn parse_node_path(path: &str) -> Option<Vec<usize>> {
    let rest = path.trim().strip_prefix('$')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    rest.strip_prefix('.')?
        .split('.')
        .map(|seg| seg.parse::<usize>().ok())
        .collect()
}

pub fn leaf_count(node: &TreeNode) -> usize {
    if node.is_leaf() {
        1
    } else {
        node.children.iter().map(leaf_count).sum()
    }
}

/// 水平排版宽度：叶子越多越宽，至少填满可视区
pub fn layout_width(root: &TreeNode, viewport_width: u32) -> u32 {
    let by_leaves = leaf_count(root) as u32 * LEAF_SPACING;
    by_leaves.max(viewport_width.saturating_sub(HORIZONTAL_MARGIN))
}

/// 文字形式的大纲（每层两格缩排，前面附索引路径）
pub fn render_outline(root: &TreeNode) -> String {
    build_outline(root)
        .iter()
        .map(|row| {
            let marker = if row.is_leaf() { "·" } else { "▾" };
            format!(
                "{}{} {}    [{}]",
                "  ".repeat(row.depth as usize),
                marker,
                row.name,
                row.path
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
