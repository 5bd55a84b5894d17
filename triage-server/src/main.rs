//! 急诊分诊服务主程序

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use triage_core::Staff;
use triage_engine::{
    AdmissionRequest, AdmissionWorkflow, InMemoryAdmissionStore, InMemoryPatientDirectory, InMemoryReportStore,
    InMemoryStaffDirectory, TriageQueue,
};

/// 分诊服务命令行参数
#[derive(Parser, Debug)]
#[command(name = "triage-server")]
#[command(about = "急诊分诊入院服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 种子数据文件（JSON），覆盖配置文件
    #[arg(short, long)]
    seed: Option<String>,

    /// 启动后叫号的人数，覆盖配置文件
    #[arg(short, long)]
    dispatch: Option<usize>,
}

/// 种子数据：医护人员和待登记的入院请求
#[derive(Debug, Deserialize)]
struct SeedData {
    #[serde(default)]
    staff: Vec<Staff>,
    #[serde(default)]
    admissions: Vec<AdmissionRequest>,
}

fn load_seed(path: &str, staff: &InMemoryStaffDirectory, workflow: &AdmissionWorkflow) -> Result<()> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read seed file: {}", path))?;
    let seed: SeedData = serde_json::from_str(&contents).with_context(|| format!("Invalid seed file: {}", path))?;

    for member in seed.staff {
        staff.add(member)?;
    }

    let mut registered = 0;
    for request in &seed.admissions {
        match workflow.register_admission(request) {
            Ok(_) => registered += 1,
            Err(e) => warn!("Skipping seed admission for {}: {}", request.patient_cuil, e),
        }
    }

    info!("Seed loaded from {}: {} of {} admissions registered", path, registered, seed.admissions.len());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置并初始化日志
    let config = triage_admin::bootstrap(args.config.as_deref(), args.log_level.as_deref())?;

    let staff = Arc::new(InMemoryStaffDirectory::new());
    let workflow = AdmissionWorkflow::new(
        Arc::new(InMemoryPatientDirectory::new()),
        staff.clone(),
        Arc::new(InMemoryAdmissionStore::new()),
        Arc::new(InMemoryReportStore::new()),
        Arc::new(TriageQueue::new()),
    );

    if config.queue.rebuild_on_start {
        workflow.rebuild_queue()?;
    }

    if let Some(path) = args.seed.as_deref().or(config.service.seed_path.as_deref()) {
        load_seed(path, &staff, &workflow)?;
    }

    info!("分诊队列:");
    for (position, admission) in workflow.list_queue()?.iter().enumerate() {
        info!(
            "  {}. {:?} {} 到达 {} - {}",
            position + 1,
            admission.id(),
            admission.urgency(),
            admission.arrived_at().format("%H:%M:%S"),
            admission.description()
        );
    }

    let dispatches = args.dispatch.unwrap_or(config.queue.dispatch_on_start);
    for _ in 0..dispatches {
        match workflow.dispatch_next_patient()? {
            Some(admission) => info!("叫号: {:?} ({})", admission.id(), admission.urgency()),
            None => {
                info!("队列已空");
                break;
            }
        }
    }

    let overview = workflow.overview()?;
    println!("{}", serde_json::to_string_pretty(&overview)?);

    Ok(())
}
