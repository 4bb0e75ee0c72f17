//! Clipboard  cross-platform clipboard helpers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Clip(String),
}

/// 读取系统剪贴板文字（贴上 CSV 用）
pub fn read_clipboard_text() -> Result<String, ClipboardError> {
    use copypasta::{ClipboardContext, ClipboardProvider};
    let mut ctx = ClipboardContext::new().map_err(|e| ClipboardError::Clip(e.to_string()))?;
    ctx.get_contents()
        .map_err(|e| ClipboardError::Clip(e.to_string()))
}

impl From<ClipboardError> for crate::model::data_core::AppError {
    fn from(e: ClipboardError) -> Self {
        crate::model::data_core::AppError::Clipboard(e.to_string())
    }
}
