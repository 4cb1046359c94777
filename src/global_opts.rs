use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulates a zombie outbreak with the Munz et al. ODE model")]
pub struct Cli{
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    /// Log level: off, error, warn, info, debug or trace
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: CmdChooser
}

#[derive(Parser, Debug)]
pub struct JsonOpt{
    #[arg(short, long)]
    /// File Name of json file. Without it the default json is printed
    pub json: Option<Utf8PathBuf>,

    #[arg(long)]
    /// Only write the data, do not call gnuplot
    pub no_plot: bool
}

#[derive(Parser, Debug)]
pub struct DemoOpt{
    #[arg(long)]
    /// Only write the data, do not call gnuplot
    pub no_plot: bool,

    #[arg(short, long)]
    /// Directory for the output files, defaults to the working directory
    pub out_dir: Option<Utf8PathBuf>
}

#[derive(Subcommand, Debug)]
pub enum CmdChooser{
    /// Run a single scenario
    Run(JsonOpt),
    /// Run the three built-in scenarios
    Demo(DemoOpt),
    /// Sweep one parameter and record final populations
    Scan(JsonOpt),
    /// Print the json of every integration method
    Methods
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands()
    {
        let cli = Cli::try_parse_from(["zombie_outbreak", "run", "--json", "a.json", "--no-plot"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Info);
        match cli.command{
            CmdChooser::Run(opt) => {
                assert_eq!(opt.json.as_deref().map(|p| p.as_str()), Some("a.json"));
                assert!(opt.no_plot);
            },
            other => panic!("unexpected {other:?}")
        }

        let cli = Cli::try_parse_from(["zombie_outbreak", "demo", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Debug);
        assert!(matches!(cli.command, CmdChooser::Demo(DemoOpt{no_plot: false, out_dir: None})));

        let cli = Cli::try_parse_from(["zombie_outbreak", "demo", "--out-dir", "plots"]).unwrap();
        match cli.command{
            CmdChooser::Demo(opt) => assert_eq!(opt.out_dir.as_deref().map(|p| p.as_str()), Some("plots")),
            other => panic!("unexpected {other:?}")
        }
    }

    #[test]
    fn cli_is_consistent()
    {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
