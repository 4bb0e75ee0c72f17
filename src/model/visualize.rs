//! 表格 → 树状图：每一列一个节点，每个键一个叶子（单向，不回写表格）

use crate::model::data_core::TreeView;
use crate::model::table::Row;
use crate::model::tree::TreeNode;

/// 合成根节点名称
pub const VISUAL_ROOT: &str = "Root";

pub fn rows_to_tree(rows: &[Row]) -> TreeNode {
    let children = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let leaves = row
                .iter()
                .map(|(key, value)| TreeNode::leaf(format!("{}: {}", key, value)))
                .collect();
            TreeNode::branch(format!("Row {}", index + 1), leaves)
        })
        .collect();
    TreeNode::branch(VISUAL_ROOT, children)
}

/// 把表格画到树状视图上；没有视图时只记录警告
pub fn visualize(rows: &[Row], renderer: Option<&mut TreeView>) -> bool {
    match renderer {
        Some(view) => {
            view.draw(rows_to_tree(rows));
            tracing::info!("表格已转为树状图: {} 列", rows.len());
            true
        }
        None => {
            tracing::warn!("{}", crate::vm::bridge::WARN_NO_RENDERER);
            false
        }
    }
}
