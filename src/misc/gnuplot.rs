use std::{
    io::{BufWriter, Write},
    process::{Command, Output}
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err::File;
use log::{debug, warn};

use super::create_buf;

pub fn create_gnuplot_buf<P>(path: P) -> std::io::Result<BufWriter<File>>
where P: AsRef<Utf8Path>
{
    let mut buf = create_buf(path)?;
    super::write_commands_and_version(&mut buf)?;
    Ok(buf)
}

pub fn call_gnuplot<P>(gp_file_name: P) -> std::io::Result<Output>
where P: AsRef<Utf8Path>
{
    Command::new("gnuplot")
        .arg(gp_file_name.as_ref().as_str())
        .output()
}

/// One curve: `using` column spec of the data file plus its key entry
pub struct Curve<'a>{
    pub using: &'a str,
    pub title: &'a str
}

pub struct GnuplotLines<'a>{
    pub title: &'a str,
    pub xlabel: &'a str,
    pub ylabel: &'a str,
    pub data: &'a Utf8Path,
    pub curves: &'a [Curve<'a>]
}

impl GnuplotLines<'_>{
    pub fn write_script<W: Write>(&self, mut w: W, png: &Utf8Path) -> std::io::Result<()>
    {
        writeln!(w, "set t pngcairo size 1200,600")?;
        writeln!(w, "set output '{}'", escape_quotes(png.as_str()))?;
        writeln!(w, "set title '{}' font ',16'", escape_quotes(self.title))?;
        writeln!(w, "set xlabel '{}' font ',14'", escape_quotes(self.xlabel))?;
        writeln!(w, "set ylabel '{}' font ',14'", escape_quotes(self.ylabel))?;
        writeln!(w, "set grid")?;
        writeln!(w, "set key top right")?;
        write!(w, "p")?;
        for (i, curve) in self.curves.iter().enumerate(){
            let file = if i == 0 {
                escape_quotes(self.data.as_str())
            } else {
                String::new()
            };
            if i > 0 {
                write!(w, ",")?;
            }
            write!(w, " '{file}' u {} w l lw 2 t '{}'", curve.using, escape_quotes(curve.title))?;
        }
        writeln!(w)?;
        writeln!(w, "set output")
    }

    /// Writes `{stem}.gp`, runs gnuplot on it and returns the png path.
    /// A missing or failing gnuplot is not an error, the script stays around
    pub fn render(&self, stem: &Utf8Path) -> std::io::Result<Option<Utf8PathBuf>>
    {
        let gp_name = with_suffix(stem, "gp");
        let png = with_suffix(stem, "png");
        let mut gp_writer = create_gnuplot_buf(&gp_name)?;
        self.write_script(&mut gp_writer, &png)?;
        gp_writer.flush()?;
        drop(gp_writer);

        match call_gnuplot(&gp_name){
            Ok(out) if out.status.success() => {
                debug!("gnuplot rendered {png}");
                Ok(Some(png))
            },
            Ok(out) => {
                warn!(
                    "gnuplot failed on {gp_name}: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Ok(None)
            },
            Err(e) => {
                warn!("unable to call gnuplot ({e}), plot script left at {gp_name}");
                Ok(None)
            }
        }
    }
}

/// Appends an extension. Unlike `with_extension` this keeps dots inside the stem
pub fn with_suffix(stem: &Utf8Path, extension: &str) -> Utf8PathBuf
{
    Utf8PathBuf::from(format!("{stem}.{extension}"))
}

fn escape_quotes(s: &str) -> String
{
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_plots_every_curve_from_one_file()
    {
        let curves = [
            Curve{using: "1:2", title: "Humans"},
            Curve{using: "1:3", title: "Zombies"},
        ];
        let plot = GnuplotLines{
            title: "It's here",
            xlabel: "Days from outbreak",
            ylabel: "Population",
            data: Utf8Path::new("run.dat"),
            curves: &curves
        };
        let mut script = Vec::new();
        plot.write_script(&mut script, Utf8Path::new("run.png")).unwrap();
        let script = String::from_utf8(script).unwrap();
        assert!(script.contains("set output 'run.png'"));
        assert!(script.contains("set title 'It''s here'"));
        assert!(script.contains("p 'run.dat' u 1:2 w l lw 2 t 'Humans', '' u 1:3 w l lw 2 t 'Zombies'"));
        assert!(script.trim_end().ends_with("set output"));
    }

    #[test]
    fn quotes_in_paths_are_escaped()
    {
        let curves = [Curve{using: "1:2", title: "Humans"}];
        let plot = GnuplotLines{
            title: "t",
            xlabel: "x",
            ylabel: "y",
            data: Utf8Path::new("out/it's.dat"),
            curves: &curves
        };
        let mut script = Vec::new();
        plot.write_script(&mut script, Utf8Path::new("out/it's.png")).unwrap();
        let script = String::from_utf8(script).unwrap();
        assert!(script.contains("set output 'out/it''s.png'"));
        assert!(script.contains("p 'out/it''s.dat' u 1:2"));
    }

    #[test]
    fn render_leaves_script_and_reports_png()
    {
        let dir = tempfile::tempdir().unwrap();
        let stem = Utf8PathBuf::from_path_buf(dir.path().join("plot")).unwrap();
        let dat = with_suffix(&stem, "dat");
        std::fs::write(&dat, "0 1\n1 2\n").unwrap();
        let curves = [Curve{using: "1:2", title: "Humans"}];
        let plot = GnuplotLines{
            title: "t",
            xlabel: "x",
            ylabel: "y",
            data: &dat,
            curves: &curves
        };
        // works with and without gnuplot installed
        let png = plot.render(&stem).unwrap();
        assert!(with_suffix(&stem, "gp").exists());
        if let Some(png) = png {
            assert_eq!(png, with_suffix(&stem, "png"));
            assert!(png.exists());
        }
    }

    #[test]
    fn suffix_keeps_dots_in_stem()
    {
        let p = with_suffix(Utf8Path::new("out/Rc_1.5_P_30"), "gp");
        assert_eq!(p.as_str(), "out/Rc_1.5_P_30.gp");
    }
}
