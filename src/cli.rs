// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "crashd",
    version,
    about = "Crash diagnostics - collect diagnostic artifacts from many machines at once",
    long_about = "crashd runs diagnostics scripts that fan commands, captures and file copies out to\nhosts, Kubernetes nodes, cloud instances and workspaces in parallel, tolerating\nper-target failures, and bundles the collected artifacts for offline analysis.",
    after_help = "EXAMPLES:\n  Run a script:                 crashd run diagnose.yaml\n  Pass script arguments:        crashd run diagnose.yaml --args user=ops,hosts=10.0.0.1\n  Raise parallelism:            crashd --parallel 32 run diagnose.yaml\n  List builtins:                crashd builtins"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        help = "Settings file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./crashd.yaml)\n  3. User config (~/.config/crashd/config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        help = "Maximum resources dispatched concurrently (overrides settings)"
    )]
    pub parallel: Option<usize>,

    #[arg(long, help = "Work directory for collected artifacts (overrides settings)")]
    pub workdir: Option<String>,

    #[arg(long, help = "Hide per-resource progress spinners")]
    pub no_progress: bool,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run a diagnostics script",
        long_about = "Runs the steps of a YAML diagnostics script top to bottom.\nA failing step halts the script; failures on individual resources are reported\nin the step's results and do not stop the script.\n\nExit codes: 0 (script completed), 1 (a step failed)"
    )]
    Run {
        #[arg(help = "Script file")]
        script: PathBuf,

        #[arg(
            long,
            value_delimiter = ',',
            value_parser = parse_script_arg,
            help = "Script arguments as key=value pairs, visible to the script as $key"
        )]
        args: Vec<(String, String)>,
    },

    #[command(about = "List the builtins a script can call")]
    Builtins,
}

fn parse_script_arg(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{text}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{text}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
