use anyhow::{Context, Result};
use std::path::Path;

use continuation_fetch::config::ContinuationFetchConfig;
use continuation_fetch::observability::workflow_metrics;
use continuation_fetch::workflow::{
    FindUserWorkflow, RequestId, UserDto, UserRequest, WorkflowState,
};

use super::Commands;

pub async fn run(command: Option<Commands>, config: &ContinuationFetchConfig) -> Result<()> {
    match command {
        None => fetch_command(config, 1, None, false, false).await,
        Some(Commands::Fetch {
            user_id,
            request_id,
            native,
            json,
        }) => fetch_command(config, user_id, request_id, native, json).await,
        Some(Commands::Batch { user_ids, json }) => batch_command(config, &user_ids, json).await,
        Some(Commands::Resume { snapshot, json }) => {
            resume_command(config, &snapshot, json).await
        }
        Some(Commands::Config) => config_command(config),
    }
}

fn render(dto: &UserDto, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(dto)?)
    } else {
        Ok(dto.to_string())
    }
}

async fn fetch_command(
    config: &ContinuationFetchConfig,
    user_id: u64,
    request_id: Option<String>,
    native: bool,
    json: bool,
) -> Result<()> {
    let workflow = FindUserWorkflow::from_config(config);
    let request = match request_id {
        Some(id) => UserRequest::new(RequestId::new(id), user_id),
        None => UserRequest::for_user(user_id),
    };

    let dto = if native {
        workflow.run_native(request).await?
    } else {
        workflow.run(request).await?
    };

    println!("{}", render(&dto, json)?);
    Ok(())
}

async fn batch_command(
    config: &ContinuationFetchConfig,
    user_ids: &[u64],
    json: bool,
) -> Result<()> {
    let workflow = FindUserWorkflow::from_config(config);
    let outcomes = workflow.run_batch(user_ids).await;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(dto) => println!("user {}: {}", outcome.request.user_id, render(dto, json)?),
            Err(e) => println!("user {}: failed: {e}", outcome.request.user_id),
        }
    }

    let stats = workflow_metrics().get_stats();
    println!(
        "started={} resumed={} completed={} failed={}",
        stats.started, stats.resumed, stats.completed, stats.failed
    );
    Ok(())
}

async fn resume_command(
    config: &ContinuationFetchConfig,
    snapshot: &Path,
    json: bool,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(snapshot)
        .await
        .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
    let state = WorkflowState::from_json(&raw)?;

    let workflow = FindUserWorkflow::from_config(config);
    let dto = workflow.resume(state).await?;

    println!("{}", render(&dto, json)?);
    Ok(())
}

fn config_command(config: &ContinuationFetchConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
