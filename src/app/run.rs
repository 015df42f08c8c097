// Copyright 2024 Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::app::args::RunInstruction;
use crate::uniq::{open_filter, ProcessedKeyLog, UriReceiver, UriUniqFilter};
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Writes every received uri as a line. Keeps the first write error.
#[derive(Debug)]
pub struct LineReceiver<W> {
    writer: W,
    written: u64,
    error: Option<std::io::Error>,
}

impl<W: Write> LineReceiver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the writer, or the first error that happened while writing.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> UriReceiver for LineReceiver<W> {
    fn receive(&mut self, uri: &str) {
        if self.error.is_some() {
            return;
        }
        match writeln!(self.writer, "{uri}") {
            Ok(_) => self.written += 1,
            Err(err) => self.error = Some(err),
        }
    }
}

/// The numbers of a finished run.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RunStats {
    pub replayed: u64,
    pub read: u64,
    pub first_seen: u64,
    pub distinct: u64,
}

/// Adds every non-blank line of [input] to [filter]. Returns the number of uris read.
pub fn filter_lines<U: UriUniqFilter + ?Sized>(
    filter: &mut U,
    input: impl BufRead,
) -> anyhow::Result<u64> {
    let mut read = 0u64;
    for line in input.lines() {
        let line = line.context("Failed to read the input!")?;
        let uri = line.trim();
        if uri.is_empty() {
            continue;
        }
        filter.add(uri)?;
        read += 1;
    }
    Ok(read)
}

/// Runs the filter from [instruction] over its input and writes the first seen uris to [output].
pub fn run<W: Write>(instruction: &RunInstruction, output: W) -> anyhow::Result<RunStats> {
    let mut filter_config = instruction.configs.filter.clone();
    // the processed key log is attached after seeding
    let processed_key_log = filter_config.processed_key_log.take();
    let mut filter = open_filter(&filter_config, LineReceiver::new(output))
        .context("Failed to open the filter!")?;

    let mut stats = RunStats::default();
    if let Some(ref seed_log) = instruction.seed_log {
        stats.replayed = ProcessedKeyLog::replay(seed_log, &mut filter)
            .with_context(|| format!("Failed to replay {seed_log}!"))?;
    }
    if let Some(path) = processed_key_log {
        filter.set_processed_key_log(Some(
            ProcessedKeyLog::open(&path).with_context(|| format!("Failed to open {path}!"))?,
        ));
    }

    stats.read = match instruction.input {
        Some(ref path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {path}!"))?;
            filter_lines(&mut filter, BufReader::new(file))?
        }
        None => filter_lines(&mut filter, std::io::stdin().lock())?,
    };
    filter.close()?;
    stats.distinct = filter.count();

    let (_, receiver) = filter.into_parts();
    stats.first_seen = receiver.written();
    receiver.finish().context("Failed to write the uris!")?;

    log::info!(
        "Read {} uris, {} were new, {} distinct keys known (replayed {}).",
        stats.read,
        stats.first_seen,
        stats.distinct,
        stats.replayed
    );
    Ok(stats)
}

/// Runs the filter from [instruction] and prints the first seen uris to stdout.
pub fn run_to_stdout(instruction: &RunInstruction) -> anyhow::Result<RunStats> {
    run(instruction, BufWriter::new(std::io::stdout().lock()))
}
