use std::io::Write;

use super::{model::Populations, numeric_integration::Solution};

pub const TRAJECTORY_HEADER: [&str; 4] = ["day", "humans", "zombies", "deceased"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample{
    pub time: f64,
    pub populations: Populations
}

/// Time ascending output of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory{
    samples: Vec<Sample>
}

impl From<Solution<3>> for Trajectory{
    fn from(solution: Solution<3>) -> Self {
        let samples = solution.times
            .into_iter()
            .zip(solution.values)
            .map(|(time, y)| Sample{time, populations: y.into()})
            .collect();
        Self{samples}
    }
}

impl Trajectory{
    pub fn samples(&self) -> &[Sample]
    {
        &self.samples
    }

    pub fn len(&self) -> usize
    {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample>
    {
        self.samples.last()
    }

    /// First sample with the maximal number of zombies
    pub fn zombie_peak(&self) -> Option<&Sample>
    {
        self.samples.iter()
            .reduce(
                |best, s|
                {
                    if s.populations.zombies > best.populations.zombies {
                        s
                    } else {
                        best
                    }
                }
            )
    }

    pub fn write_columns<W: Write>(&self, mut w: W) -> std::io::Result<()>
    {
        for s in self.samples.iter(){
            let p = &s.populations;
            writeln!(w, "{} {} {} {}", s.time, p.humans, p.zombies, p.deceased)?;
        }
        Ok(())
    }
}
