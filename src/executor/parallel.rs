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

//! Bounded-parallel fan-out over a resource set.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::{ContextSnapshot, SshConfig};
use crate::error::{CrashdError, Result};
use crate::resource::ResourceSet;
use crate::ssh::SshTransport;
use crate::ssm::InstanceTransport;
use crate::utils::ensure_dir;

use super::operation::{dispatch, plan, DispatchEnv, Operation, Plan};
use super::progress::{finish, FanOutProgress};
use super::result_types::{aggregate, AggregateOutcome, OperationResult};

/// Dispatches one operation to every resource of a set.
///
/// Every input resource yields exactly one [`OperationResult`], placed at
/// the resource's input index, so result order never depends on completion
/// order. Up to `max_parallel` resources (from the run config) are in
/// flight at once; a per-resource timeout never cancels the others.
pub struct FanOutExecutor {
    ssh: Arc<dyn SshTransport>,
    instances: Arc<dyn InstanceTransport>,
    show_progress: bool,
}

impl FanOutExecutor {
    pub fn new(ssh: Arc<dyn SshTransport>, instances: Arc<dyn InstanceTransport>) -> Self {
        Self {
            ssh,
            instances,
            show_progress: false,
        }
    }

    /// Show per-resource spinners while dispatching.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run `operation` on every resource of `resources`.
    ///
    /// Fails only when arguments cannot be resolved for the call as a
    /// whole (missing credentials, bad jump proxy, unusable work directory).
    /// Per-resource failures are recorded in the returned results.
    pub async fn execute(
        &self,
        operation: &Operation,
        resources: &ResourceSet,
        snapshot: &ContextSnapshot,
        explicit_ssh: Option<&SshConfig>,
    ) -> Result<AggregateOutcome> {
        let plans = resources
            .iter()
            .map(|resource| plan(operation, resource, snapshot, explicit_ssh))
            .collect::<Result<Vec<_>>>()?;

        let workdir = snapshot.crashd.workdir_path();
        if operation.writes_locally() {
            ensure_dir(&workdir).await?;
        }

        let max_parallel = snapshot.crashd.max_parallel.max(1);
        let dispatch_timeout = snapshot.crashd.dispatch_timeout.map(Duration::from_secs);
        tracing::info!(
            "{}: dispatching to {} resource(s), up to {} at a time",
            operation.name(),
            resources.len(),
            max_parallel
        );

        let env = DispatchEnv {
            ssh: Arc::clone(&self.ssh),
            instances: Arc::clone(&self.instances),
            agent: snapshot.key_agent.clone(),
            workdir,
        };
        let operation = Arc::new(operation.clone());
        let semaphore = Arc::new(Semaphore::new(max_parallel));
        let progress = FanOutProgress::new(self.show_progress);

        let targets: Vec<String> = resources.iter().map(|r| r.target().to_string()).collect();
        let mut slots: Vec<Option<OperationResult>> = vec![None; targets.len()];
        let mut tasks = Vec::new();

        for (idx, (target, plan)) in targets.iter().zip(plans).enumerate() {
            if let Plan::Unsupported(reason) = &plan {
                slots[idx] = Some(OperationResult::failure(target.clone(), reason.clone()));
                continue;
            }

            let pb = progress.add(target, "Queued");
            let env = env.clone();
            let operation = Arc::clone(&operation);
            let semaphore = Arc::clone(&semaphore);
            let target = target.clone();

            let task = tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => {
                        pb.set_message(operation.name().to_string());
                        tracing::debug!("{}: dispatching to {}", operation.name(), target);
                        run_one(&operation, &target, &plan, &env, dispatch_timeout).await
                    }
                    Err(e) => OperationResult::failure(
                        target.clone(),
                        format!("Semaphore acquisition failed: {e}"),
                    ),
                };
                finish(&pb, &result);
                result
            });
            tasks.push((idx, task));
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = tasks.into_iter().unzip();
        for (idx, joined) in indices.into_iter().zip(join_all(handles).await) {
            slots[idx] = Some(match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Task failed for resource {}: {}", targets[idx], e);
                    OperationResult::failure(targets[idx].clone(), format!("Task execution failed: {e}"))
                }
            });
        }

        let results: Vec<OperationResult> = slots
            .into_iter()
            .zip(&targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| OperationResult::failure(target.clone(), "not dispatched"))
            })
            .collect();

        let failures = results.iter().filter(|r| !r.is_success()).count();
        for failed in results.iter().filter(|r| !r.is_success()) {
            tracing::warn!("{} failed on {}: {}", operation.name(), failed.resource, failed.error);
        }
        tracing::info!(
            "{}: {} succeeded, {} failed",
            operation.name(),
            results.len() - failures,
            failures
        );

        Ok(aggregate(results))
    }
}

async fn run_one(
    operation: &Operation,
    target: &str,
    plan: &Plan,
    env: &DispatchEnv,
    dispatch_timeout: Option<Duration>,
) -> OperationResult {
    let outcome = match dispatch_timeout {
        Some(limit) => match tokio::time::timeout(limit, dispatch(operation, target, plan, env)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(CrashdError::dispatch(
                target,
                format!("dispatch timed out after {}s", limit.as_secs()),
            )),
        },
        None => dispatch(operation, target, plan, env).await,
    };

    match outcome {
        Ok(payload) => OperationResult::success(target, payload),
        Err(CrashdError::DispatchFailure { reason, .. }) => OperationResult::failure(target, reason),
        Err(e) => OperationResult::failure(target, e.to_string()),
    }
}
