// ==========================================
// 排班派工系统 - 命令行入口
// ==========================================
// 用法:
//   workforce-aps ingest <file> [--db PATH] [--table NAME] [--partition TAG] [--prefix P]
//   workforce-aps bundle <folder> [--db PATH] [--partition TAG] [--prefix P]
//   workforce-aps template <folder> <logical>
//   workforce-aps assign --tasks F [--attendance F] [--competencies F] [--priorities F]
//                        [--start D --end D] [--cap N] [--output PATH] [--db PATH]
// 环境变量:
//   RUST_LOG            日志级别（默认 info）
//   WORKFORCE_APS_LOG   设为 json 时输出 JSON 行日志
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use workforce_aps::config::{ConfigManager, SettingsReader};
use workforce_aps::db::get_default_db_path;
use workforce_aps::domain::{AssignmentOutput, ExtractKind};
use workforce_aps::engine::{AssignmentEngine, AssignmentRequest, DateRange, OutputTarget};
use workforce_aps::importer::{template_for_kind, ExtractSource, IngestContext, TableIngestor};
use workforce_aps::logging;

/// 位置参数 + `--flag value` 形式的参数
struct Args {
    positional: Vec<String>,
    flags: HashMap<String, String>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        let mut raw = raw.peekable();
        while let Some(arg) = raw.next() {
            if let Some(name) = arg.strip_prefix("--") {
                let value = raw
                    .next()
                    .ok_or_else(|| anyhow!("参数 --{} 缺少取值", name))?;
                flags.insert(name.to_string(), value);
            } else {
                positional.push(arg);
            }
        }
        Ok(Self { positional, flags })
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn positional(&self, idx: usize, what: &str) -> Result<&str> {
        self.positional
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("缺少参数: {}", what))
    }

    fn db_path(&self) -> String {
        self.flag("db")
            .map(str::to_string)
            .unwrap_or_else(get_default_db_path)
    }

    fn context(&self) -> Result<IngestContext> {
        let mut ctx = IngestContext::open(&self.db_path())?;
        if let Some(tag) = self.flag("partition") {
            ctx = ctx.with_partition(tag);
        }
        if let Some(prefix) = self.flag("prefix") {
            ctx = ctx.with_prefix(prefix);
        }
        Ok(ctx)
    }
}

fn main() -> Result<()> {
    if std::env::var("WORKFORCE_APS_LOG").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::info!("{} v{}", workforce_aps::APP_NAME, workforce_aps::VERSION);

    let mut raw = std::env::args().skip(1);
    let command = raw.next().unwrap_or_default();
    let args = Args::parse(raw)?;

    match command.as_str() {
        "ingest" => run_ingest(&args),
        "bundle" => run_bundle(&args),
        "template" => run_template(&args),
        "assign" => run_assign(&args),
        other => bail!("未知命令: '{}'（可用: ingest / bundle / template / assign）", other),
    }
}

fn run_ingest(args: &Args) -> Result<()> {
    let path = Path::new(args.positional(0, "file")?);
    let ctx = args.context()?;
    let settings = ConfigManager::new(&args.db_path())?.ingest_settings()?;
    let outcome = TableIngestor::new(settings).ingest_file(&ctx, path, args.flag("table"))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_bundle(args: &Args) -> Result<()> {
    let folder = Path::new(args.positional(0, "folder")?);
    let ctx = args.context()?;
    let settings = ConfigManager::new(&args.db_path())?.ingest_settings()?;
    let outcomes = TableIngestor::new(settings).ingest_bundle(&ctx, folder);
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

fn run_template(args: &Args) -> Result<()> {
    let folder = Path::new(args.positional(0, "folder")?);
    let logical = args.positional(1, "logical")?;
    let kind = ExtractKind::from_logical_name(logical)
        .ok_or_else(|| anyhow!("未知数据集: {}", logical))?;
    let settings = ConfigManager::new(&args.db_path())?.ingest_settings()?;
    let bytes = template_for_kind(
        folder,
        kind,
        workforce_aps::importer::DEFAULT_TEMPLATE_ROWS,
        &settings.format,
    )?;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}

fn run_assign(args: &Args) -> Result<()> {
    let tasks = args
        .flag("tasks")
        .ok_or_else(|| anyhow!("缺少参数: --tasks"))?;
    let settings = ConfigManager::new(&args.db_path())?.assign_settings()?;
    let engine = AssignmentEngine::new(settings)?;

    let output = match args.flag("output") {
        Some(path) => OutputTarget::File(PathBuf::from(path)),
        None => OutputTarget::Bytes,
    };
    let optional = |name: &str| args.flag(name).map(ExtractSource::path);

    let mut request = AssignmentRequest::new(ExtractSource::path(tasks), output);
    request.attendance = optional("attendance");
    request.competencies = optional("competencies");
    request.priorities = optional("priorities");
    request.range = DateRange {
        start: args.flag("start").map(str::to_string),
        end: args.flag("end").map(str::to_string),
    };
    if let Some(cap) = args.flag("cap") {
        request.max_per_resource_per_day =
            Some(cap.trim().parse().context("--cap 必须为整数")?);
    }

    let report = engine.run(&request)?;
    match &report.output {
        AssignmentOutput::Bytes(bytes) => std::io::stdout().write_all(bytes)?,
        AssignmentOutput::File { path, backup } => {
            eprintln!("output={}", path.display());
            if let Some(backup) = backup {
                eprintln!("backup={}", backup.display());
            }
        }
    }
    eprintln!(
        "run_id={} dates={} assigned={} unassigned={}",
        report.run_id,
        report.dates.len(),
        report.assigned,
        report.unassigned
    );
    Ok(())
}
