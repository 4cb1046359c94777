use {
    std::{
        io::{Write, BufReader, BufWriter},
        fmt::Display
    },
    camino::Utf8Path,
    fs_err::File,
    serde_json::Value,
    serde::{Serialize, Deserialize, de::DeserializeOwned},
    indicatif::{ProgressBar, ProgressStyle},
    crate::error::{OutbreakError, OutbreakResult}
};

mod gnuplot;
pub use gnuplot::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

pub fn write_json<W: Write>(mut writer: W, json: &Value) -> std::io::Result<()>
{
    write!(writer, "#")?;
    serde_json::to_writer(&mut writer, json)?;
    writeln!(writer)
}

pub fn indication_bar(len: u64) -> ProgressBar
{
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise} - {eta_precise}] {wide_bar} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar
}

pub fn create_buf<P>(path: P) -> std::io::Result<BufWriter<File>>
where P: AsRef<Utf8Path>
{
    let file = File::create(path.as_ref().as_std_path())?;
    Ok(BufWriter::new(file))
}

pub fn write_commands<W: Write>(mut w: W) -> std::io::Result<()>
{
    write!(w, "#")?;
    for arg in std::env::args()
    {
        write!(w, " {arg}")?;
    }
    writeln!(w)
}

pub fn write_commands_and_version<W: Write>(mut w: W) -> std::io::Result<()>
{
    writeln!(w, "# v{VERSION} {GIT_HASH}")?;
    write_commands(w)
}

pub fn write_slice_head<W, S, D>(mut w: W, slice: S) -> std::io::Result<()>
where W: Write,
    S: IntoIterator<Item=D>,
    D: Display
{
    write!(w, "#")?;
    for (s, i) in slice.into_iter().zip(1_u16..){
        write!(w, " {s}_{i}")?;
    }
    writeln!(w)
}

/// Data file starting with version, command, the json config that produced it
/// and the column names
pub fn create_data_buf<P, C, S, D>(path: P, config: &C, header: S) -> OutbreakResult<BufWriter<File>>
where P: AsRef<Utf8Path>,
    C: Serialize,
    S: IntoIterator<Item=D>,
    D: Display
{
    let mut buf = create_buf(path)?;
    write_commands_and_version(&mut buf)?;
    let json = serde_json::to_value(config)?;
    write_json(&mut buf, &json)?;
    write_slice_head(&mut buf, header)?;
    Ok(buf)
}

/// Reads the config from `file`. Without a file the default config is
/// printed to stdout instead and `None` is returned
pub fn parse<P, T>(file: Option<P>) -> OutbreakResult<Option<T>>
where P: AsRef<Utf8Path>,
    T: Default + Serialize + DeserializeOwned
{
    match file
    {
        None => {
            let example = T::default();
            let mut stdout = std::io::stdout();
            serde_json::to_writer_pretty(&mut stdout, &example)?;
            writeln!(stdout)?;
            Ok(None)
        },
        Some(file) => {
            let f = File::open(file.as_ref().as_std_path())?;
            let buf = BufReader::new(f);
            let opt: T = serde_json::from_reader(buf)?;
            Ok(Some(opt))
        }
    }
}

pub trait PrintAlternatives{
    fn print_alternatives(layer: u8) -> OutbreakResult<()>;
}

pub(crate) fn print_spaces(layer: u8){
    for _ in 0..layer{
        print!(" ");
    }
}

/// Turns a free text title into something usable as file stem
pub fn file_stem_from_title(title: &str) -> String
{
    let mut stem = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for c in title.chars()
    {
        if c.is_ascii_alphanumeric() || c == '.' {
            stem.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            stem.push('_');
            last_was_sep = true;
        }
    }
    while stem.ends_with('_'){
        stem.pop();
    }
    if stem.is_empty(){
        stem.push_str("outbreak");
    }
    stem
}

/// `samples` equidistant points in `[start, end]`, both ends included exactly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SampleRangeF64
{
    pub start: f64,
    pub end: f64,
    pub samples: usize
}

impl Default for SampleRangeF64{
    fn default() -> Self {
        Self { start: 0.0, end: 1.0, samples: 11 }
    }
}

impl SampleRangeF64{
    pub fn validate(&self) -> OutbreakResult<()>
    {
        if !self.start.is_finite() || !self.end.is_finite(){
            return Err(OutbreakError::invalid(format!(
                "range bounds have to be finite, got [{}, {}]", self.start, self.end
            )));
        }
        if self.end <= self.start {
            return Err(OutbreakError::invalid(format!(
                "range end {} has to be larger than start {}", self.end, self.start
            )));
        }
        if self.samples < 2 {
            return Err(OutbreakError::invalid(format!(
                "at least 2 samples required, got {}", self.samples
            )));
        }
        Ok(())
    }

    /// Only meaningful for ranges that passed [`Self::validate`]
    pub fn get_iter(&'_ self) -> impl Iterator<Item=f64> + '_
    {
        let delta = (self.end - self.start) / (self.samples - 1) as f64;
        (0..self.samples-1)
            .map(
                move |i|
                {
                    self.start + delta * i as f64
                }
            ).chain(std::iter::once(self.end))
    }
}
