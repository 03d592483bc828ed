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

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};

use crashd::{
    builtins::{BuiltinRegistry, Runtime},
    cli::{Cli, Commands},
    config::{ConfigValue, ExecutionContext, Settings},
    executor::AggregateOutcome,
    script::{Script, ScriptRunner},
    utils::init_logging,
};

/// Format a Duration into a human-readable string
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();

    if total_seconds < 1.0 {
        format!("{:.1} ms", total_seconds * 1000.0)
    } else if total_seconds < 60.0 {
        format!("{total_seconds:.2} s")
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        format!("{minutes}m {seconds}s")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Builtins => {
            list_builtins();
            Ok(())
        }
        Commands::Run { script, args } => run_script(&cli, script, args.clone()).await,
    }
}

fn list_builtins() {
    let registry = BuiltinRegistry::standard();
    println!("{}", "Builtins:".bold());
    for builtin in registry.iter() {
        println!("  {:<22} {}", builtin.name().cyan(), builtin.summary());
    }
}

/// Seed the context from the settings file, with CLI overrides applied to
/// the run config.
async fn seed_context(cli: &Cli) -> Result<ExecutionContext> {
    let settings = Settings::load_with_priority(cli.config.as_deref()).await?;
    let mut ctx = ExecutionContext::from_settings(&settings);

    if cli.parallel.is_some() || cli.workdir.is_some() {
        let mut crashd = ctx.crashd_or_default();
        if let Some(parallel) = cli.parallel {
            crashd.max_parallel = parallel.max(1);
        }
        if let Some(workdir) = &cli.workdir {
            crashd.workdir = workdir.clone();
        }
        ctx.set(ConfigValue::Crashd(crashd));
    }
    Ok(ctx)
}

async fn run_script(cli: &Cli, path: &Path, args: Vec<(String, String)>) -> Result<()> {
    let script = Script::load(path).await?;
    let mut ctx = seed_context(cli).await?;

    let runtime = Runtime::system().with_progress(!cli.no_progress);
    let mut runner = ScriptRunner::new(BuiltinRegistry::standard(), runtime).with_args(args);

    let started = Instant::now();
    let results = runner
        .run(&script, &mut ctx)
        .await
        .with_context(|| format!("Script {path:?} failed"))?;

    for (step, value) in script.steps.iter().zip(&results) {
        print_step_outcome(&step.call, value);
    }

    println!(
        "\n{} {} step(s) in {}",
        "Completed".green().bold(),
        results.len(),
        format_duration(started.elapsed())
    );
    Ok(())
}

fn print_step_outcome(call: &str, value: &Value) {
    let Ok(outcome) = serde_json::from_value::<AggregateOutcome>(value.clone()) else {
        return;
    };
    if outcome.is_empty() {
        return;
    }

    println!("\n{} {}", "▶".cyan(), call.bold());
    for result in outcome.results() {
        result.print_summary();
    }
    let failures = outcome.failure_count();
    if failures > 0 {
        println!(
            "  {} of {} resource(s) failed",
            failures.to_string().red(),
            outcome.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.0 ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50 s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
