use {
    clap::Parser,
    global_opts::{Cli, CmdChooser},
    log::error,
    misc::*,
    std::process::ExitCode,
    zombie_model::{numeric_integration::Method, ScanOpts, ScenarioOpts}
};

pub mod misc;
mod error;
mod global_opts;
mod logging;
mod zombie_model;

fn exec(command: CmdChooser) -> error::OutbreakResult<()>
{
    match command{
        CmdChooser::Run(opt) => {
            if let Some(o) = parse::<_, ScenarioOpts>(opt.json)? {
                zombie_model::exec_scenario(&o, !opt.no_plot)?;
            }
        },
        CmdChooser::Demo(opt) => {
            zombie_model::exec_demo(!opt.no_plot, opt.out_dir.as_deref())?;
        },
        CmdChooser::Scan(opt) => {
            if let Some(o) = parse::<_, ScanOpts>(opt.json)? {
                zombie_model::exec_scan(&o, !opt.no_plot)?;
            }
        },
        CmdChooser::Methods => {
            Method::print_alternatives(0)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(cli.log_level){
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match exec(cli.command){
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
