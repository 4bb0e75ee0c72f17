//! IO helper: 读取导入文件、写出汇出档案

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::data_core::AppError;
use crate::model::export::ExportFile;

/// 读取整个文本文件
pub fn read_text_file(p: &Path) -> Result<String, AppError> {
    Ok(fs::read_to_string(p)?)
}

/// 读取原始位元组，交由呼叫端决定如何解码
pub fn read_file_bytes(p: &Path) -> Result<Vec<u8>, AppError> {
    Ok(fs::read(p)?)
}

/// 把汇出档案写到目录下，回传完整路径
pub fn write_export(dir: &Path, file: &ExportFile) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;
    let target = dir.join(&file.filename);
    fs::write(&target, file.content.as_bytes())?;
    tracing::info!("已写出: {}", target.display());
    Ok(target)
}
