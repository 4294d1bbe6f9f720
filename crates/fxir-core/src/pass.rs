use crate::circuit::Circuit;
use anyhow::Result;
use std::time::{Duration, Instant};

/// A whole-circuit transformation.
///
/// Passes consume the circuit and hand back a new one; a failing pass produces no partial output.
pub trait Pass {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    fn run(&mut self, circuit: Circuit) -> Result<Circuit>;
}

#[derive(Debug, Clone)]
pub struct PassStatistics {
    pub name: String,
    pub duration: Duration,
}

/// Runs `pass` and records how long it took.
pub fn run_timed<P: Pass + ?Sized>(
    pass: &mut P,
    circuit: Circuit,
) -> Result<(Circuit, PassStatistics)> {
    let start = Instant::now();
    let circuit = pass.run(circuit)?;
    let stats = PassStatistics {
        name: pass.name().to_string(),
        duration: start.elapsed(),
    };
    Ok((circuit, stats))
}
