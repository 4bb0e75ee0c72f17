//! VM桥接层：会话驱动与 AppState 之间共用的提示文字

// === 常量定义（消除魔法值） ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_LOADED: &str = "表格已载入";
pub const STATUS_PASTE_IGNORED: &str = "贴上内容为空，未变更";
pub const STATUS_TREE_LOADED: &str = "树状资料已载入";
pub const STATUS_EXPORTED: &str = "已汇出";
pub const STATUS_LABEL_UNCHANGED: &str = "标签未变更";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";
pub const WARN_NO_RENDERER: &str = "請先加載 tree.js 並定義 drawTree 函式";
