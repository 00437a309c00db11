//! Configuration-built chains and end-to-end deployment

use deploy_chain::{
    deploy, ChainError, ClassLoader, ConfigError, DeployError, DeploymentChain,
    DeploymentUnitContext, DeploymentUnitProcessingError, DeploymentUnitProcessor, FnProcessor,
    ProcessorCatalog, ServiceBatch, ServiceDefinition, ServiceDeploymentItem,
    StaticServiceDeployment,
};
use deploy_test_utils::{
    init_tracing, invocations, record, AlphaProcessor, BravoProcessor, FailingProcessor,
    FailingServiceDeployment,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn catalog() -> ProcessorCatalog {
    let mut catalog = ProcessorCatalog::new();
    catalog.register("alpha", || Arc::new(AlphaProcessor::new()) as Arc<dyn DeploymentUnitProcessor>);
    catalog.register("bravo", || Arc::new(BravoProcessor::new()) as Arc<dyn DeploymentUnitProcessor>);
    catalog.register_instance("failing", Arc::new(FailingProcessor::new("rejected by policy")));
    catalog.register_instance(
        "emit-services",
        Arc::new(FnProcessor::new("emit-services", |context: &mut DeploymentUnitContext| {
            record(context, "emit-services");
            let name = context.name().to_string();
            context.add_item(ServiceDeploymentItem::new(
                StaticServiceDeployment::new(ClassLoader::named(format!("deployment.{name}")))
                    .with_service(ServiceDefinition::new(format!("{name}.web")))
                    .with_service(ServiceDefinition::new(format!("{name}.jndi"))),
            ));
            Ok(())
        })),
    );
    catalog
}

#[test]
fn chain_built_from_toml_file_runs_in_priority_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.toml");
    std::fs::write(
        &path,
        r#"
        name = "default"

        [[processor]]
        processor = "emit-services"
        priority = "max"

        [[processor]]
        processor = "bravo"
        priority = "-5"

        [[processor]]
        processor = "alpha"
        priority = "min"
        "#,
    )
    .unwrap();

    let chain = DeploymentChain::from_path(&path, &catalog()).unwrap();
    assert_eq!(chain.name(), "default");

    let mut context = DeploymentUnitContext::new("shop.war");
    chain.process_deployment(&mut context).unwrap();
    assert_eq!(invocations(&context), vec!["alpha", "bravo", "emit-services"]);
    assert_eq!(context.items().len(), 1);
}

#[test]
fn bad_configuration_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let unknown = dir.path().join("unknown.toml");
    std::fs::write(&unknown, "name = \"x\"\n[[processor]]\nprocessor = \"nope\"\npriority = 1\n").unwrap();
    let malformed = dir.path().join("malformed.toml");
    std::fs::write(&malformed, "name = \"x\"\n[[processor]]\nprocessor = \"alpha\"\npriority = \"soon\"\n").unwrap();
    let fractional = dir.path().join("fractional.toml");
    std::fs::write(&fractional, "name = \"x\"\n[[processor]]\nprocessor = \"alpha\"\npriority = 1.5\n").unwrap();

    let catalog = catalog();
    assert!(matches!(
        DeploymentChain::from_path(&unknown, &catalog),
        Err(ConfigError::Chain(ChainError::UnknownProcessor(name))) if name == "nope"
    ));
    assert!(matches!(
        DeploymentChain::from_path(&malformed, &catalog),
        Err(ConfigError::Chain(ChainError::InvalidArgument(_)))
    ));
    assert!(matches!(
        DeploymentChain::from_path(&fractional, &catalog),
        Err(ConfigError::Chain(ChainError::InvalidArgument(_)))
    ));
    assert!(matches!(
        DeploymentChain::from_path(dir.path().join("missing.toml"), &catalog),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn deploy_installs_items_under_their_loader() {
    init_tracing();
    let catalog = catalog();
    let chain = DeploymentChain::new("deploy");
    chain.add_processor(catalog.create("alpha").unwrap(), 0).unwrap();
    chain.add_processor(catalog.create("emit-services").unwrap(), 10).unwrap();

    let batch = ServiceBatch::shared();
    let mut context = DeploymentUnitContext::new("shop.war").with_batch_builder(batch.clone());
    let summary = deploy(&chain, &mut context).unwrap();

    assert_eq!(summary.items_installed, 1);
    let batch = batch.lock();
    assert_eq!(batch.service_names(), vec!["shop.war.web", "shop.war.jndi"]);
    assert!(batch
        .services()
        .iter()
        .all(|s| s.loader == ClassLoader::named("deployment.shop.war")));
}

#[test]
fn failed_processing_installs_nothing() {
    init_tracing();
    let catalog = catalog();
    let chain = DeploymentChain::new("deploy");
    chain.add_processor(catalog.create("emit-services").unwrap(), 0).unwrap();
    chain.add_processor(catalog.create("failing").unwrap(), 10).unwrap();

    let batch = ServiceBatch::shared();
    let mut context = DeploymentUnitContext::new("shop.war").with_batch_builder(batch.clone());
    let err = deploy(&chain, &mut context).unwrap_err();

    let DeployError::Processing(ChainError::Processing(cause)) = &err else {
        panic!("expected processing failure, got {err:?}");
    };
    assert_eq!(cause.message(), "rejected by policy");
    assert!(batch.lock().is_empty());
    assert_eq!(context.items().len(), 1);
}

#[test]
fn duplicate_services_across_deployments_fail_install() {
    init_tracing();
    let chain = DeploymentChain::new("deploy");
    chain.add_processor(catalog().create("emit-services").unwrap(), 0).unwrap();
    let batch = ServiceBatch::shared();

    let mut first = DeploymentUnitContext::new("shop.war").with_batch_builder(batch.clone());
    deploy(&chain, &mut first).unwrap();
    let mut again = DeploymentUnitContext::new("shop.war").with_batch_builder(batch.clone());
    let err = deploy(&chain, &mut again).unwrap_err();

    assert!(matches!(err, DeployError::Install { index: 0, .. }));
    assert_eq!(batch.lock().len(), 2);
    assert_eq!(again.items().len(), 1);
}

#[test]
fn item_failure_surfaces_with_position() {
    init_tracing();
    let chain = DeploymentChain::new("deploy");
    chain
        .add_processor(
            Arc::new(FnProcessor::new("emit-broken", |context: &mut DeploymentUnitContext| {
                context.add_item(ServiceDeploymentItem::new(
                    StaticServiceDeployment::new(ClassLoader::named("module.ok"))
                        .with_service(ServiceDefinition::new("ok")),
                ));
                context.add_item(ServiceDeploymentItem::new(FailingServiceDeployment {
                    loader: ClassLoader::named("module.broken"),
                }));
                Ok::<(), DeploymentUnitProcessingError>(())
            })),
            0,
        )
        .unwrap();

    let batch = ServiceBatch::shared();
    let mut context = DeploymentUnitContext::new("mixed.ear").with_batch_builder(batch.clone());
    let err = deploy(&chain, &mut context).unwrap_err();

    assert!(matches!(err, DeployError::Install { index: 1, .. }));
    assert!(err.to_string().starts_with("deployment item 1 failed to install"));
    assert_eq!(batch.lock().service_names(), vec!["ok", "test.failing.partial"]);

    let pending = context.take_items();
    assert_eq!(pending.len(), 1);
    let json = serde_json::to_value(&pending[0]).unwrap();
    assert_eq!(json["deployment"]["deployment"], "test-failing");
}
