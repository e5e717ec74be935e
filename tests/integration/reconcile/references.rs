//! Services placed in a ProjectVPC wait for the VPC resource to run.

use super::{postgres, project_vpc, Harness, PROJECT};
use aiven_operator::controller::handler::{ProjectVpcHandler, ServiceHandler};
use aiven_operator::controller::Phase;
use aiven_operator::crd::{ManagedResource, ResourceReference};
use aiven_operator::provider::memory::Operation;
use aiven_operator::PostgreSql;
use std::sync::Arc;

#[tokio::test]
async fn test_service_waits_for_project_vpc() {
    let vpcs = Harness::new(ProjectVpcHandler);
    let services = Harness::with_collaborators(
        ServiceHandler::<PostgreSql>::new(),
        Arc::clone(&vpcs.store),
        Arc::clone(&vpcs.avn),
    );

    let mut pg = postgres("pg-main");
    pg.spec.common.project_vpc_ref = Some(ResourceReference {
        name: "vpc-main".to_string(),
        namespace: None,
    });
    let pg_key = services.insert(&pg);

    // Reference missing
    assert_eq!(services.pass(&pg_key).await.unwrap().phase, Phase::PreconditionsPending);

    // Reference present, not running
    let vpc_key = vpcs.insert(&project_vpc("vpc-main"));
    assert_eq!(vpcs.pass(&vpc_key).await.unwrap().phase, Phase::Reconciling);
    assert_eq!(services.pass(&pg_key).await.unwrap().phase, Phase::PreconditionsPending);
    assert_eq!(vpcs.avn.calls(Operation::CreateService), 0);

    let vpc_id = vpcs.stored(&vpc_key).remote_id().unwrap().to_string();
    vpcs.avn.set_vpc_state(PROJECT, &vpc_id, "ACTIVE");
    assert_eq!(vpcs.pass(&vpc_key).await.unwrap().phase, Phase::Running);

    assert_eq!(services.pass(&pg_key).await.unwrap().phase, Phase::Reconciling);
    let created = services.avn.service(PROJECT, "pg-main").unwrap();
    assert_eq!(created.project_vpc_id.as_deref(), Some(vpc_id.as_str()));
}

#[tokio::test]
async fn test_explicit_vpc_id_needs_no_reference() {
    let services = Harness::new(ServiceHandler::<PostgreSql>::new());
    let mut pg = postgres("pg-main");
    pg.spec.common.project_vpc_id = Some("vpc-fixed".to_string());
    let key = services.insert(&pg);

    assert_eq!(services.pass(&key).await.unwrap().phase, Phase::Reconciling);
    assert_eq!(
        services.avn.service(PROJECT, "pg-main").unwrap().project_vpc_id.as_deref(),
        Some("vpc-fixed")
    );
}
