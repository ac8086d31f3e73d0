use crate::InMemoryStateStoreProvider;
use auditflow_core::{
    domain::client::{BusinessSize, ClientType, RegisterClient},
    domain::step::StepStatus,
    domain::workflow::{Workflow, WorkflowState},
    CoreError, TemplateCatalog,
};

fn sample_workflow(client: &auditflow_core::Client) -> Workflow {
    let catalog = TemplateCatalog::builtin().unwrap();
    let template = catalog.resolve(ClientType::Gst, BusinessSize::Small).unwrap();
    Workflow::from_template(client, template)
}

fn sample_client(name: &str) -> auditflow_core::Client {
    RegisterClient::new(name, "GST", "small", "FY 2024-25")
        .into_client()
        .unwrap()
}

#[tokio::test]
async fn test_client_repository_keeps_creation_order() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (client_repo, _) = provider.create_repositories();

    let names = ["Alpha", "Bravo", "Charlie", "Delta"];
    for name in names {
        client_repo.insert(&sample_client(name)).await?;
    }

    let all = client_repo.list(0, None).await?;
    assert_eq!(
        all.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        names.to_vec()
    );

    let page = client_repo.list(1, Some(2)).await?;
    assert_eq!(
        page.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Bravo", "Charlie"]
    );
    assert!(client_repo.list(10, None).await?.is_empty());

    let found = client_repo.find_by_id(&all[2].id).await?;
    assert_eq!(found.map(|c| c.name), Some("Charlie".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_client_id_rejected() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (client_repo, _) = provider.create_repositories();

    let client = sample_client("Alpha");
    client_repo.insert(&client).await?;
    assert!(matches!(
        client_repo.insert(&client).await,
        Err(CoreError::StateStoreError(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_workflow_document_round_trip() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, workflow_repo) = provider.create_repositories();

    let client = sample_client("Alpha");
    let mut workflow = sample_workflow(&client);
    workflow.apply_step_status("gst-registration", StepStatus::InProgress)?;

    workflow_repo.insert(&workflow).await?;
    let loaded = workflow_repo.find_by_id(&workflow.id).await?.unwrap();
    assert_eq!(loaded, workflow);

    let active = workflow_repo
        .find_active(&client.id, &client.fiscal_year)
        .await?
        .unwrap();
    assert_eq!(active.id, workflow.id);

    Ok(())
}

#[tokio::test]
async fn test_single_active_workflow_per_client_year() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, workflow_repo) = provider.create_repositories();

    let client = sample_client("Alpha");
    workflow_repo.insert(&sample_workflow(&client)).await?;

    let err = workflow_repo
        .insert(&sample_workflow(&client))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(workflow_repo.list_by_client(&client.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_update_is_compare_and_swap() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, workflow_repo) = provider.create_repositories();

    let client = sample_client("Alpha");
    let workflow = workflow_repo.insert(&sample_workflow(&client)).await?;

    let mut first = workflow.clone();
    first.apply_step_status("gst-registration", StepStatus::Completed)?;
    let stored = workflow_repo.update(&first).await?;
    assert_eq!(stored.revision, 1);

    let mut stale = workflow.clone();
    stale.apply_step_status("gst-registration", StepStatus::InProgress)?;
    assert!(workflow_repo.update(&stale).await.unwrap_err().is_conflict());

    let current = workflow_repo.find_by_id(&workflow.id).await?.unwrap();
    assert_eq!(current.revision, 1);
    assert_eq!(current.steps[0].status, StepStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn test_update_unknown_workflow_is_not_found() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, workflow_repo) = provider.create_repositories();

    let workflow = sample_workflow(&sample_client("Alpha"));
    let err = workflow_repo.update(&workflow).await.unwrap_err();
    assert_eq!(err, CoreError::WorkflowNotFound(workflow.id.to_string()));

    Ok(())
}

#[tokio::test]
async fn test_supersede_swaps_active_atomically() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, workflow_repo) = provider.create_repositories();

    let client = sample_client("Alpha");
    let current = workflow_repo.insert(&sample_workflow(&client)).await?;
    let replacement = sample_workflow(&client);

    workflow_repo.supersede(&current, &replacement).await?;

    let retired = workflow_repo.find_by_id(&current.id).await?.unwrap();
    assert_eq!(retired.state, WorkflowState::Superseded);
    assert_eq!(retired.superseded_by, Some(replacement.id.clone()));
    assert_eq!(retired.revision, current.revision + 1);

    let active = workflow_repo
        .find_active(&client.id, &client.fiscal_year)
        .await?
        .unwrap();
    assert_eq!(active.id, replacement.id);

    // The retired copy the caller still holds is stale now
    let again = sample_workflow(&client);
    assert!(workflow_repo
        .supersede(&current, &again)
        .await
        .unwrap_err()
        .is_conflict());
    assert_eq!(workflow_repo.list_by_client(&client.id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_repositories_share_provider_storage() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (client_repo_a, _) = provider.create_repositories();
    let (client_repo_b, _) = provider.create_repositories();

    let client = sample_client("Alpha");
    client_repo_a.insert(&client).await?;
    assert!(client_repo_b.find_by_id(&client.id).await?.is_some());

    Ok(())
}
