// ==========================================
// RDV 排期与分配系统 - 运维命令行入口
// ==========================================
// 用法:
//   rdv-planning init
//   rdv-planning week <department> <year> <week>
//   rdv-planning overview <year> <week>
//   rdv-planning template <year> <week>
//   rdv-planning iso-week <YYYY-MM-DD>
//   rdv-planning commercials [--active]
//   rdv-planning log [<department>]
//   rdv-planning log-entry <action_id>
//
// 数据库路径: RDV_PLANNING_DB_PATH 或用户数据目录
// 结果以 JSON 输出到 stdout,日志输出到 stderr
// ==========================================

use chrono::NaiveDate;
use rdv_planning::app::{get_default_db_path, AppState};
use rdv_planning::domain::calendar::{iso_week_of, weekdays_of};
use serde_json::json;
use std::error::Error;

const USAGE: &str = "用法: rdv-planning <init | week <dept> <year> <week> | overview <year> <week> | template <year> <week> | iso-week <YYYY-MM-DD> | commercials [--active] | log [<dept>] | log-entry <action_id>>";

/// log 命令默认输出的条数
const RECENT_LOG_LIMIT: u32 = 50;

fn main() -> Result<(), Box<dyn Error>> {
    rdv_planning::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).ok_or(USAGE)?;

    match command {
        "iso-week" => {
            let raw = args.get(1).ok_or(USAGE)?;
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
            let week = iso_week_of(date);
            let days = weekdays_of(week.year, week.week)?;
            print_json(&json!({
                "date": date,
                "iso_week": week.to_string(),
                "year": week.year,
                "week": week.week,
                "business_days": days
                    .iter()
                    .map(|d| json!({ "weekday": d.weekday, "label": d.label(), "date": d.date }))
                    .collect::<Vec<_>>(),
            }))
        }
        "init" => {
            let state = open_state()?;
            tracing::info!(db_path = %state.db_path, "数据库已初始化");
            print_json(&json!({ "db_path": state.db_path, "version": rdv_planning::VERSION }))
        }
        "week" => {
            let department = args.get(1).ok_or(USAGE)?;
            let (year, week) = parse_year_week(&args, 2)?;
            let state = open_state()?;
            let grid = state.planning_api.get_week(department, year, week)?;
            let totals = grid.day_totals();
            print_json(&json!({ "grid": grid, "day_totals": totals }))
        }
        "overview" => {
            let (year, week) = parse_year_week(&args, 1)?;
            let state = open_state()?;
            let overview = state.planning_api.week_overview(year, week)?;
            print_json(&serde_json::to_value(overview)?)
        }
        "template" => {
            let (year, week) = parse_year_week(&args, 1)?;
            let state = open_state()?;
            let rows = state.template_api.list_template(year, week)?;
            print_json(&serde_json::to_value(rows)?)
        }
        "commercials" => {
            let active_only = args.get(1).map(String::as_str) == Some("--active");
            let state = open_state()?;
            let commercials = state.directory_api.list_commercials(active_only)?;
            print_json(&serde_json::to_value(commercials)?)
        }
        "log" => {
            let state = open_state()?;
            let logs = match args.get(1) {
                Some(department) => state.action_log_repo.find_by_department(department)?,
                None => state.action_log_repo.find_recent(RECENT_LOG_LIMIT)?,
            };
            print_json(&serde_json::to_value(logs)?)
        }
        "log-entry" => {
            let action_id = args.get(1).ok_or(USAGE)?;
            let state = open_state()?;
            let log = state
                .action_log_repo
                .find_by_id(action_id)?
                .ok_or_else(|| format!("操作日志不存在: {}", action_id))?;
            print_json(&serde_json::to_value(log)?)
        }
        _ => Err(USAGE.into()),
    }
}

fn open_state() -> Result<AppState, Box<dyn Error>> {
    let db_path = get_default_db_path();
    Ok(AppState::new(db_path)?)
}

fn parse_year_week(args: &[String], at: usize) -> Result<(i32, u32), Box<dyn Error>> {
    let year = args.get(at).ok_or(USAGE)?.parse::<i32>()?;
    let week = args.get(at + 1).ok_or(USAGE)?.parse::<u32>()?;
    Ok((year, week))
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
