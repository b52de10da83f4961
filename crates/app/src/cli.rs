use std::path::PathBuf;

use carryover_core::{transfer_all, PolyMesh, TransferOutcome, TransferReport};
use tracing_subscriber::filter::LevelFilter;

use crate::demo::demo_plan;
use crate::logging::parse_level;
use crate::obj_io::{load_obj_mesh, write_obj};
use crate::plan::{load_plan, resolve_requests};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Plan(PathBuf),
    Demo,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CliArgs {
    pub command: Command,
    pub output: Option<PathBuf>,
    pub log_level: LevelFilter,
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut command = None;
    let mut output = None;
    let mut log_level = LevelFilter::INFO;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--plan" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--plan requires a path".to_string())?;
                command = Some(Command::Plan(PathBuf::from(value)));
            }
            "--demo" => {
                command = Some(Command::Demo);
            }
            "--output" | "-o" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--output requires a path".to_string())?;
                output = Some(PathBuf::from(value));
            }
            "--log-level" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--log-level requires a level".to_string())?;
                log_level = parse_level(value)?;
            }
            "--help" | "-h" => {
                command = Some(Command::Help);
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }

    Ok(CliArgs {
        command: command.unwrap_or(Command::Help),
        output,
        log_level,
    })
}

pub(crate) fn print_help() {
    println!(
        "Usage: carryover [options]\n  --plan <path>        run a JSON transfer plan\n  --demo               transfer layers between two generated grids\n  --output <path>      write the target mesh as OBJ (overrides the plan)\n  --log-level <level>  off | error | warn | info | debug | trace"
    );
}

pub(crate) fn run(args: &CliArgs) -> Result<(), String> {
    match &args.command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Demo => {
            let mut demo = demo_plan()?;
            tracing::info!(
                "demo: {} source faces onto {} target faces",
                demo.source.face_count(),
                demo.target.face_count()
            );
            let reports = transfer_all(
                &demo.source,
                &mut demo.target,
                &demo.requests,
                &demo.settings,
            )
            .map_err(|err| err.to_string())?;
            log_reports(&reports);
            save_output(args.output.as_ref(), &demo.target)
        }
        Command::Plan(path) => {
            let plan = load_plan(path)?;
            let settings = plan.settings();
            let source = load_obj_mesh(&plan.source)?;
            let mut target = load_obj_mesh(&plan.target)?;
            tracing::info!(
                "plan: {:?} ({} faces) onto {:?} ({} faces)",
                plan.source,
                source.face_count(),
                plan.target,
                target.face_count()
            );
            let requests = resolve_requests(&plan.transfers, &source, &target)?;
            let reports = transfer_all(&source, &mut target, &requests, &settings)
                .map_err(|err| err.to_string())?;
            log_reports(&reports);
            save_output(args.output.as_ref().or(plan.output.as_ref()), &target)
        }
    }
}

fn log_reports(reports: &[TransferReport]) {
    for report in reports {
        let request = &report.request;
        match report.outcome {
            TransferOutcome::Applied => tracing::info!(
                "{:?} {:?}: wrote {}/{} elements, {} without correspondence",
                request.mode,
                request.layer_type,
                report.written,
                report.elements,
                report.unmapped
            ),
            TransferOutcome::Skipped(err) => tracing::warn!(
                "{:?} {:?}: skipped ({})",
                request.mode,
                request.layer_type,
                err
            ),
        }
    }
    tracing::info!("completed {} transfers", reports.len());
}

fn save_output(path: Option<&PathBuf>, mesh: &PolyMesh) -> Result<(), String> {
    let Some(path) = path else {
        return Ok(());
    };
    write_obj(path, mesh)?;
    tracing::info!("saved target mesh to {:?}", path);
    Ok(())
}
