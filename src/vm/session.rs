//! 会话驱动：单执行绪事件循环，每一行输入对应一次使用者操作
//!
//! 失败的操作只回报提示文字并保留原状态，不会中断会话。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::model::cell::CellValue;
use crate::model::columns::{NewColumnConfig, NewColumnKind};
use crate::model::data_core::{AppError, AppState};
use crate::model::export::ExportFile;
use crate::utils::clipboard::read_clipboard_text;
use crate::utils::fs::{read_text_file, write_export};
use crate::vm::bridge::*;

/// 贴上文字的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteSource {
    File(PathBuf),
    Clipboard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Import(PathBuf),
    Paste { source: PasteSource, no_header: bool },
    AddRow,
    RemoveRow,
    AddColumn(Option<NewColumnConfig>),
    RemoveColumn,
    Select { row: usize, col: usize },
    SetCell { row: usize, col: usize, value: CellValue },
    ExportCsv,
    ExportJson,
    Visualize,
    Upload { path: PathBuf, json_path: Option<String> },
    EditLabel { node: String, text: String },
    Download,
    ShowSheet,
    ShowTree,
    Validate,
    Help,
    Quit,
}

pub const HELP: &str = "\
import <csv>                        导入 CSV（第一列为标题）
paste <file|--clipboard> [--no-header]  贴上 CSV 文字
add-row | remove-row                新增 / 删除列（删除选取列或最后一列）
add-col [名称 [类型 [预设值]]]      新增栏（text / numeric / date / dropdown[=a|b]）
remove-col                          删除选取栏或最后一栏
select <列> <栏> | set <列> <栏> <值>
export-csv | export-json            汇出 edited-<时间>.csv / .json
visualize                           表格转树状图
upload <json> [JSONPath]            上传 JSON 到树状图
edit <节点路径> <新文字>            修改树节点标签（路径如 $.0.2）
download                            下载 edited_tree.json
show | tree | validate | help | quit";

fn parse_index(arg: Option<&String>, what: &str) -> Result<usize, String> {
    let raw = arg.ok_or_else(|| format!("缺少{}", what))?;
    raw.parse::<usize>()
        .map_err(|_| format!("{} 不是有效的{}", raw, what))
}

/// 解析一行指令；空行与 `#` 注解回传 None
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let args = shell_words::split(line).map_err(|e| format!("指令解析失败: {}", e))?;
    let Some((head, rest)) = args.split_first() else {
        return Ok(None);
    };
    if head.starts_with('#') {
        return Ok(None);
    }
    let cmd = match head.as_str() {
        "import" => Command::Import(PathBuf::from(rest.first().ok_or("缺少 CSV 路径")?)),
        "paste" => {
            let no_header = rest.iter().any(|a| a == "--no-header");
            let source = if rest.iter().any(|a| a == "--clipboard") {
                PasteSource::Clipboard
            } else {
                let path = rest
                    .iter()
                    .find(|a| !a.starts_with("--"))
                    .ok_or("缺少贴上来源")?;
                PasteSource::File(PathBuf::from(path))
            };
            Command::Paste { source, no_header }
        }
        "add-row" => Command::AddRow,
        "remove-row" => Command::RemoveRow,
        "add-col" => match rest {
            [] => Command::AddColumn(None),
            [name, more @ ..] => {
                let kind: NewColumnKind = match more.first() {
                    Some(k) => k.parse()?,
                    None => NewColumnKind::Text,
                };
                let default_value = more
                    .get(1)
                    .map(|v| CellValue::from_field(v))
                    .unwrap_or_default();
                Command::AddColumn(Some(NewColumnConfig::new(name, kind).with_default(default_value)))
            }
        },
        "remove-col" => Command::RemoveColumn,
        "select" => Command::Select {
            row: parse_index(rest.first(), "列号")?,
            col: parse_index(rest.get(1), "栏号")?,
        },
        "set" => Command::SetCell {
            row: parse_index(rest.first(), "列号")?,
            col: parse_index(rest.get(1), "栏号")?,
            value: rest.get(2).map(|v| CellValue::from_field(v)).unwrap_or_default(),
        },
        "export-csv" => Command::ExportCsv,
        "export-json" => Command::ExportJson,
        "visualize" => Command::Visualize,
        "upload" => Command::Upload {
            path: PathBuf::from(rest.first().ok_or("缺少 JSON 路径")?),
            json_path: rest.get(1).cloned(),
        },
        "edit" => Command::EditLabel {
            node: rest.first().ok_or("缺少节点路径")?.clone(),
            text: rest[1.min(rest.len())..].join(" "),
        },
        "download" => Command::Download,
        "show" => Command::ShowSheet,
        "tree" => Command::ShowTree,
        "validate" => Command::Validate,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("未知指令: {}", other)),
    };
    Ok(Some(cmd))
}

/// 一次操作的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// 会话：持有唯一的 AppState 与汇出目录
pub struct Session {
    pub state: AppState,
    out_dir: PathBuf,
    clock: fn() -> DateTime<Utc>,
}

impl Session {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            state: AppState::default(),
            out_dir,
            clock: Utc::now,
        }
    }

    /// 指定时钟（测试用固定时间）
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn save(&self, file: &ExportFile) -> Result<String, AppError> {
        let target = write_export(&self.out_dir, file)?;
        Ok(format!("{}: {}", STATUS_EXPORTED, target.display()))
    }

    /// 执行单一指令；错误转为提示文字
    pub fn handle(&mut self, cmd: Command) -> Outcome {
        if cmd == Command::Quit {
            return Outcome::Quit;
        }
        match self.apply(cmd) {
            Ok(message) => Outcome::Continue(message),
            Err(e) => {
                tracing::error!("操作失败: {}", e);
                Outcome::Continue(format!("{}{}", STATUS_ERROR_PREFIX, e))
            }
        }
    }

    fn apply(&mut self, cmd: Command) -> Result<String, AppError> {
        let state = &mut self.state;
        match cmd {
            Command::Import(path) => {
                state.import_csv_file(&path)?;
                Ok(format!("{}: {} 栏, {} 列", STATUS_LOADED, state.sheet.col_count(), state.sheet.row_count()))
            }
            Command::Paste { source, no_header } => {
                let text = match source {
                    PasteSource::File(path) => read_text_file(&path)?,
                    PasteSource::Clipboard => read_clipboard_text()?,
                };
                if state.paste_text(&text, no_header)? {
                    Ok(format!("{}: {} 栏, {} 列", STATUS_LOADED, state.sheet.col_count(), state.sheet.row_count()))
                } else {
                    Ok(STATUS_PASTE_IGNORED.to_string())
                }
            }
            Command::AddRow => {
                state.sheet.add_row();
                Ok(format!("{} 列", state.sheet.row_count()))
            }
            Command::RemoveRow => Ok(match state.sheet.remove_row() {
                Some(i) => format!("已删除第 {} 列", i + 1),
                None => "没有可删除的列".to_string(),
            }),
            Command::AddColumn(config) => {
                match config {
                    Some(c) => state.sheet.add_column(c)?,
                    None => state.sheet.add_default_column()?,
                }
                Ok(format!("栏位: {}", state.sheet.headers().join(", ")))
            }
            Command::RemoveColumn => Ok(match state.sheet.remove_column() {
                Some(name) => format!("已删除栏位 {}", name),
                None => "没有可删除的栏位".to_string(),
            }),
            Command::Select { row, col } => {
                state.sheet.select(row, col)?;
                Ok(format!("已选取 ({}, {})", row, col))
            }
            Command::SetCell { row, col, value } => {
                state.sheet.set_cell(row, col, value)?;
                Ok(format!("已更新 ({}, {})", row, col))
            }
            Command::ExportCsv => {
                let file = state.export_csv((self.clock)())?;
                self.save(&file)
            }
            Command::ExportJson => {
                let file = state.export_json((self.clock)())?;
                self.save(&file)
            }
            Command::Visualize => {
                state.visualize_sheet();
                Ok(state.tree.render().unwrap_or_default())
            }
            Command::Upload { path, json_path } => {
                state.tree.load_json_file(&path, json_path.as_deref())?;
                Ok(STATUS_TREE_LOADED.to_string())
            }
            Command::EditLabel { node, text } => {
                if state.tree.edit_label(&node, &text)? {
                    Ok(state.tree.render().unwrap_or_default())
                } else {
                    Ok(STATUS_LABEL_UNCHANGED.to_string())
                }
            }
            Command::Download => {
                let file = state.tree.download()?;
                self.save(&file)
            }
            Command::ShowSheet => Ok(render_sheet(state)),
            Command::ShowTree => state
                .tree
                .render()
                .ok_or(AppError::NothingToDownload),
            Command::Validate => {
                let report = state.sheet.validation_report();
                if report.is_empty() {
                    return Ok("全部单元格通过验证".to_string());
                }
                let headers = state.sheet.headers();
                Ok(report
                    .iter()
                    .map(|(r, c, v)| format!("第 {} 列 [{}] 不合法: {}", r + 1, headers[*c], v))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    /// 事件循环：逐行读取指令直到 quit 或输入结束
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "{}", STATUS_READY)?;
        for line in input.lines() {
            let line = line?;
            let message = match parse_command(&line) {
                Ok(None) => continue,
                Ok(Some(cmd)) => match self.handle(cmd) {
                    Outcome::Quit => break,
                    Outcome::Continue(message) => message,
                },
                Err(e) => format!("{}{}", STATUS_ERROR_PREFIX, e),
            };
            writeln!(output, "{}", message)?;
        }
        output.flush()
    }
}

/// 表格的文字呈现：标题（含推断类型）与各列资料
pub fn render_sheet(state: &AppState) -> String {
    let (headers, rows) = state.sheet.current_data_objects();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        state
            .sheet
            .columns()
            .iter()
            .map(|c| format!("{} <{}>", c.label, c.kind.name()))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<String> = headers.iter().map(|h| row[h].to_string()).collect();
        lines.push(format!("{}: {}", i + 1, cells.join(" | ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn run_script(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_quoted_arguments() {
        assert_eq!(
            parse_command(r#"edit $.1 "age: 31""#).unwrap(),
            Some(Command::EditLabel { node: "$.1".into(), text: "age: 31".into() })
        );
        assert_eq!(parse_command("  add-row  ").unwrap(), Some(Command::AddRow));
        assert_eq!(
            parse_command(r#"set 0 0 """#).unwrap(),
            Some(Command::SetCell { row: 0, col: 0, value: CellValue::Empty })
        );
        assert_eq!(
            parse_command(r#"set 0 3 "say \"hi\"""#).unwrap(),
            Some(Command::SetCell { row: 0, col: 3, value: CellValue::Text(r#"say "hi""#.into()) })
        );
    }

    #[test]
    fn test_unterminated_quote_rejected() {
        let err = parse_command(r#"edit $.0 "age: 31"#).unwrap_err();
        assert!(err.starts_with("指令解析失败"), "未闭合的引号应回报错误: {}", err);

        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let mut session = Session::new(dir.path().to_path_buf());
        let output = run_script(&mut session, "edit $.0 \"age: 31\nadd-row\n");
        assert!(output.contains(STATUS_ERROR_PREFIX));
        assert_eq!(session.state.tree.current().map(|t| t.name.as_str()), Some("root"));
        assert_eq!(session.state.sheet.row_count(), 3, "错误后继续执行");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("# 注解").unwrap(), None);
        assert_eq!(parse_command("add-col").unwrap(), Some(Command::AddColumn(None)));
        assert_eq!(
            parse_command("add-col 分数 numeric 0").unwrap(),
            Some(Command::AddColumn(Some(
                NewColumnConfig::new("分数", NewColumnKind::Numeric).with_default(CellValue::Text("0".into()))
            )))
        );
        assert_eq!(
            parse_command("paste --clipboard --no-header").unwrap(),
            Some(Command::Paste { source: PasteSource::Clipboard, no_header: true })
        );
        assert_eq!(
            parse_command("edit $.0 new label").unwrap(),
            Some(Command::EditLabel { node: "$.0".into(), text: "new label".into() })
        );
        assert!(parse_command("select x 1").is_err());
        assert!(parse_command("frobnicate").is_err());
        assert!(parse_command("add-col x timestamp").is_err());
    }

    #[test]
    fn test_session_exports_files() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let mut session = Session::new(dir.path().to_path_buf()).with_clock(fixed_clock);
        let output = run_script(
            &mut session,
            "select 0 1\nremove-col\nadd-col\nexport-csv\nexport-json\ndownload\nquit\nadd-row\n",
        );
        assert!(output.contains("已删除栏位 日期"));
        let csv = std::fs::read_to_string(dir.path().join("edited-2025-01-02-03-04-05.csv")).unwrap();
        assert_eq!(csv.lines().next(), Some("\u{feff}年齡,類別,備註,Column 4"));
        let json = std::fs::read_to_string(dir.path().join("edited-2025-01-02-03-04-05.json")).unwrap();
        assert!(json.contains("\"Column 4\": \"\""));
        assert!(dir.path().join("edited_tree.json").exists());
        assert_eq!(session.state.sheet.row_count(), 2, "quit 之后的指令不应执行");
    }

    #[test]
    fn test_errors_do_not_stop_session() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let mut session = Session::new(dir.path().to_path_buf());
        let output = run_script(&mut session, "import /nonexistent.csv\nbogus\nadd-row\n");
        assert!(output.contains(STATUS_ERROR_PREFIX));
        assert!(output.contains("未知指令"));
        assert_eq!(session.state.sheet.row_count(), 3, "错误后继续执行");
    }

    #[test]
    fn test_upload_invalid_json_alert() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        let outcome = session.handle(Command::Upload { path: bad, json_path: None });
        assert_eq!(
            outcome,
            Outcome::Continue(format!("{}請上傳有效的 JSON 檔案", STATUS_ERROR_PREFIX))
        );
        assert_eq!(session.state.tree.current().map(|t| t.name.as_str()), Some("root"));
    }

    #[test]
    fn test_visualize_then_download() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let mut session = Session::new(dir.path().to_path_buf());
        session.handle(Command::Visualize);
        session.handle(Command::Download);
        let json = std::fs::read_to_string(dir.path().join("edited_tree.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Row 1"]["年齡"], serde_json::json!(20));
        assert_eq!(value["Row 2"]["備註"], serde_json::json!("示例"));
    }

    #[test]
    fn test_paste_whitespace_file_ignored() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let blank = dir.path().join("blank.csv");
        std::fs::write(&blank, "  \n ").unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        let outcome = session.handle(Command::Paste {
            source: PasteSource::File(blank),
            no_header: false,
        });
        assert_eq!(outcome, Outcome::Continue(STATUS_PASTE_IGNORED.to_string()));
    }

    #[test]
    fn test_render_sheet() {
        let state = AppState::default();
        let text = render_sheet(&state);
        let first = text.lines().next().unwrap();
        assert_eq!(first, "年齡 <numeric> | 日期 <date> | 類別 <dropdown> | 備註 <text>");
        assert!(text.contains("1: 20 | 2025-01-01 | 其他 | 示例"));
    }
}
