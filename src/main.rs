//! 程序入口：初始化日志、解析命令行，并分派到表格、树状图或会话模式

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use biaoge_shu::model::data_core::{AppState, TreeView};
use biaoge_shu::model::outline::{layout_width, DEFAULT_VIEWPORT_WIDTH};
use biaoge_shu::utils::clipboard::read_clipboard_text;
use biaoge_shu::utils::fs::{read_text_file, write_export};
use biaoge_shu::vm::bridge::{STATUS_LABEL_UNCHANGED, STATUS_PASTE_IGNORED};
use biaoge_shu::vm::session::{render_sheet, Session, HELP};

/// 表格编辑（CSV/JSON 导入汇出）与 JSON 树状图工具
#[derive(Parser)]
#[command(name = "biaoge_shu", version, long_about = None)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 表格操作
    Sheet {
        #[command(subcommand)]
        action: SheetAction,
    },
    /// JSON 树状图操作
    Tree {
        #[command(subcommand)]
        action: TreeAction,
    },
    /// 互动会话：逐行读取指令
    Session {
        /// 汇出目录
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// 从文件读取指令，默认读取标准输入
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

/// 表格来源：CSV 文件、贴上文字或剪贴簿；都未指定时使用示范表
#[derive(Args)]
struct SheetInput {
    /// CSV 文件（第一列为标题）
    input: Option<PathBuf>,
    /// 以贴上方式读取的文字文件
    #[arg(long, conflicts_with_all = ["input", "clipboard"])]
    paste: Option<PathBuf>,
    /// 从剪贴簿贴上
    #[arg(long, conflicts_with = "input")]
    clipboard: bool,
    /// 贴上的文字没有标题列（产生 Column 1..N）
    #[arg(long)]
    no_header: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum SheetAction {
    /// 显示标题、推断的栏位类型与资料
    Show(SheetInput),
    /// 列出未通过验证的单元格
    Validate(SheetInput),
    /// 汇出 edited-<时间>.csv / .json
    Export {
        #[command(flatten)]
        source: SheetInput,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// 把表格转为树状图并显示大纲
    Visualize(SheetInput),
}

#[derive(Args)]
struct TreeInput {
    /// JSON 文件
    input: PathBuf,
    /// 以 JSONPath 选取子树
    #[arg(long)]
    path: Option<String>,
}

#[derive(Subcommand)]
enum TreeAction {
    /// 显示树状大纲
    Show(TreeInput),
    /// 修改节点标签后下载
    Edit {
        #[command(flatten)]
        source: TreeInput,
        /// 节点路径，如 $.0.2
        #[arg(long)]
        node: String,
        /// 新标签文字
        #[arg(long)]
        label: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// 还原为 JSON 并写出 edited_tree.json
    Download {
        #[command(flatten)]
        source: TreeInput,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn load_sheet(input: &SheetInput) -> Result<AppState> {
    let mut state = AppState::default();
    if let Some(path) = &input.input {
        state
            .import_csv_file(path)
            .with_context(|| format!("导入失败: {}", path.display()))?;
    } else if input.paste.is_some() || input.clipboard {
        let text = match &input.paste {
            Some(path) => read_text_file(path)?,
            None => read_clipboard_text()?,
        };
        if !state.paste_text(&text, input.no_header)? {
            eprintln!("{}", STATUS_PASTE_IGNORED);
        }
    }
    Ok(state)
}

fn load_tree(input: &TreeInput) -> Result<TreeView> {
    let mut view = TreeView::default();
    view.load_json_file(&input.input, input.path.as_deref())
        .with_context(|| format!("载入失败: {}", input.input.display()))?;
    Ok(view)
}

fn run_sheet(action: SheetAction) -> Result<()> {
    match action {
        SheetAction::Show(input) => {
            println!("{}", render_sheet(&load_sheet(&input)?));
        }
        SheetAction::Validate(input) => {
            let state = load_sheet(&input)?;
            let report = state.sheet.validation_report();
            for (r, c, v) in &report {
                println!("第 {} 列 [{}] 不合法: {}", r + 1, state.sheet.headers()[*c], v);
            }
            tracing::info!("验证完成: {} 个不合法单元格", report.len());
        }
        SheetAction::Export {
            source,
            format,
            out_dir,
        } => {
            let state = load_sheet(&source)?;
            let file = match format {
                ExportFormat::Csv => state.export_csv(Utc::now())?,
                ExportFormat::Json => state.export_json(Utc::now())?,
            };
            println!("{}", write_export(&out_dir, &file)?.display());
        }
        SheetAction::Visualize(input) => {
            let mut state = load_sheet(&input)?;
            state.visualize_sheet();
            if let Some(text) = state.tree.render() {
                println!("{}", text);
            }
        }
    }
    Ok(())
}

fn run_tree(action: TreeAction) -> Result<()> {
    match action {
        TreeAction::Show(input) => {
            let view = load_tree(&input)?;
            if let Some(tree) = view.current() {
                tracing::debug!("排版宽度: {}", layout_width(tree, DEFAULT_VIEWPORT_WIDTH));
            }
            println!("{}", view.render().unwrap_or_default());
        }
        TreeAction::Edit {
            source,
            node,
            label,
            out_dir,
        } => {
            let mut view = load_tree(&source)?;
            if !view.edit_label(&node, &label)? {
                eprintln!("{}", STATUS_LABEL_UNCHANGED);
            }
            println!("{}", write_export(&out_dir, &view.download()?)?.display());
        }
        TreeAction::Download { source, out_dir } => {
            let view = load_tree(&source)?;
            println!("{}", write_export(&out_dir, &view.download()?)?.display());
        }
    }
    Ok(())
}

fn run_session(out_dir: &Path, script: Option<&Path>) -> Result<()> {
    let mut session = Session::new(out_dir.to_path_buf());
    match script {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("无法开启指令文件: {}", path.display()))?;
            session.run(io::BufReader::new(file), io::stdout())?;
        }
        None => {
            if io::stdin().is_terminal() {
                println!("{}", HELP);
            }
            session.run(io::stdin().lock(), io::stdout())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志输出（写到标准错误，避免混入汇出内容）
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Commands::Sheet { action } => run_sheet(action),
        Commands::Tree { action } => run_tree(action),
        Commands::Session { out_dir, script } => run_session(&out_dir, script.as_deref()),
    }
}
