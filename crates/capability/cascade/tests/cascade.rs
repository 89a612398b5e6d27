use api_contract::{PortRequest, SourceRequest};
use async_trait::async_trait;
use domain::{CandidatePort, OneOrMany, Product, ServerDraft, SourceService, TargetSummary};
use portmap_cascade::{
    AssignError, CascadeError, CascadeStage, LookupOutcome, MissingSelection, SelectionCascade,
};
use portmap_lookup::{InMemoryLookup, LookupError, LookupSource};
use portmap_state::ConfigurationStore;
use portmap_storage::{InMemorySessionStore, SnapshotPersistence};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

fn app() -> Product {
    Product {
        id: "1".to_string(),
        name: "App".to_string(),
    }
}

fn web_source() -> SourceService {
    SourceService {
        id: "s1".to_string(),
        from_port: "80".to_string(),
        product: "App".to_string(),
        section: "web".to_string(),
    }
}

fn https_port() -> CandidatePort {
    CandidatePort {
        id: "p1".to_string(),
        product: "App".to_string(),
        from_port: "80".to_string(),
        to_port: "443".to_string(),
        protocol: "TCP".to_string(),
        port: "443".to_string(),
        section: "web".to_string(),
        description: "https".to_string(),
    }
}

fn catalog() -> InMemoryLookup {
    InMemoryLookup::new()
        .with_products(vec![app()])
        .with_sources("App", vec![web_source()])
        .with_ports(&web_source(), "App", vec![https_port()])
}

fn store() -> Arc<ConfigurationStore> {
    let persistence = SnapshotPersistence::with_default_key(Arc::new(InMemorySessionStore::new()));
    let store = Arc::new(ConfigurationStore::open(persistence));
    store.seed_demo_servers();
    store
}

fn server_count(store: &ConfigurationStore, name: &str) -> u32 {
    store
        .servers()
        .get()
        .into_iter()
        .find(|server| server.name == name)
        .map(|server| server.total_mapped_ports)
        .unwrap_or_default()
}

#[tokio::test]
async fn product_to_assignment_walkthrough() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    let servers = store.servers().get();

    let outcome = cascade
        .set_source_server(Some(servers[0].clone()))
        .await
        .expect("products");
    assert_eq!(outcome, LookupOutcome::Applied);
    assert_eq!(cascade.products().get(), vec![app()]);
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    store.set_target_server(Some(servers[1].clone()));

    cascade.select_product(Some(app())).await.expect("sources");
    assert_eq!(cascade.sources().get(), vec![web_source()]);
    assert_eq!(cascade.stage().get(), CascadeStage::ProductChosen);

    cascade
        .select_source(Some(OneOrMany::Many(vec![web_source()])))
        .await
        .expect("ports");
    assert_eq!(cascade.stage().get(), CascadeStage::TargetsLoaded);
    let targets = cascade.targets().get();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id, "p1");

    cascade.select_targets(Some(OneOrMany::One(targets[0].clone())));
    let report = cascade.assign_selected_targets().expect("assigned");
    assert_eq!(report.added, 1);
    assert_eq!(report.duplicates, 0);

    let mappings = store.mappings().get();
    assert_eq!(mappings.len(), 1);
    let mapping = &mappings[0];
    assert_eq!(mapping.source_server, "Server 1");
    assert_eq!(mapping.target_server, "Server 2");
    assert_eq!(mapping.product, "App");
    assert_eq!(mapping.protocol, "TCP");
    assert_eq!(mapping.port, "443");
    assert_eq!(mapping.section, "web");
    assert_eq!(mapping.source_server_id, "s1");
    assert_eq!(server_count(&store, "Server 1"), 1);
    assert_eq!(server_count(&store, "Server 2"), 1);
    assert_eq!(store.source_server().get().map(|s| s.total_mapped_ports), Some(1));
    assert!(store.selected_targets().get().is_empty());
    assert_eq!(cascade.stage().get(), CascadeStage::TargetsLoaded);

    cascade.select_targets(Some(OneOrMany::One(targets[0].clone())));
    let again = cascade.assign_selected_targets().expect("assigned");
    assert_eq!(again.added, 0);
    assert_eq!(again.duplicates, 1);
    assert_eq!(store.mappings().get().len(), 1);
    assert_eq!(server_count(&store, "Server 1"), 1);
    assert_eq!(server_count(&store, "Server 2"), 1);
}

#[tokio::test]
async fn assignment_reports_every_missing_selection_once() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    let err = cascade.assign_selected_targets().unwrap_err();
    assert_eq!(
        err,
        AssignError::MissingSelection(vec![
            MissingSelection::TargetServer,
            MissingSelection::Source,
            MissingSelection::Targets,
        ])
    );
    assert!(store.mappings().get().is_empty());
}

#[tokio::test]
async fn unresolved_targets_are_skipped() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    store.set_target_server(Some(store.servers().get()[1].clone()));
    cascade.select_product(Some(app())).await.expect("sources");
    cascade
        .select_source(Some(OneOrMany::One(web_source())))
        .await
        .expect("ports");
    let ghost = TargetSummary {
        id: "ghost".to_string(),
        to_port: "1".to_string(),
        product: "App".to_string(),
        protocol: None,
        port: None,
        from_port: None,
        section: None,
        description: None,
    };
    let real = TargetSummary::from(&https_port());
    cascade.select_targets(Some(OneOrMany::Many(vec![ghost, real])));
    let report = cascade.assign_selected_targets().expect("assigned");
    assert_eq!(report.added, 1);
    assert_eq!(report.unresolved, 1);
    // 源服务器未选择时写入占位名称。
    assert_eq!(store.mappings().get()[0].source_server, "Unknown");
}

/// 源服务查询按 `sources:{产品名}`、候选端口查询按 `ports:{section}` 挂起，直到测试放行。
#[derive(Default)]
struct GatedLookup {
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    failing: Mutex<HashSet<String>>,
}

impl GatedLookup {
    fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        if let Ok(mut gates) = self.gates.lock() {
            gates.insert(key.to_string(), receiver);
        }
        sender
    }

    fn fail(&self, key: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(key.to_string());
        }
    }

    fn is_waiting(&self, key: &str) -> bool {
        self.gates
            .lock()
            .map(|gates| gates.contains_key(key))
            .unwrap_or(false)
    }

    async fn pass(&self, key: &str) -> Result<(), LookupError> {
        let gate = self.gates.lock().ok().and_then(|mut gates| gates.remove(key));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(key))
            .unwrap_or(false);
        if failing {
            return Err(LookupError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LookupSource for GatedLookup {
    async fn list_products(&self) -> Result<Vec<Product>, LookupError> {
        Ok(vec![app()])
    }

    async fn list_sources(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<SourceService>, LookupError> {
        self.pass(&format!("sources:{}", request.product_name)).await?;
        Ok(vec![SourceService {
            id: format!("{}-source", request.product_name),
            from_port: "80".to_string(),
            product: request.product_name.clone(),
            section: "web".to_string(),
        }])
    }

    async fn list_ports(&self, request: &PortRequest) -> Result<Vec<CandidatePort>, LookupError> {
        self.pass(&format!("ports:{}", request.section)).await?;
        Ok(vec![CandidatePort {
            id: format!("{}-port", request.section),
            section: request.section.clone(),
            ..https_port()
        }])
    }
}

fn product(id: &str, name: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn source_in(section: &str) -> SourceService {
    SourceService {
        section: section.to_string(),
        ..web_source()
    }
}

async fn wait_until_pending(lookup: &GatedLookup, key: &str) {
    while lookup.is_waiting(key) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn slower_earlier_lookup_never_overwrites_newer_selection() {
    let lookup = Arc::new(GatedLookup::default());
    let release_slow = lookup.gate("sources:Slow");
    let cascade = Arc::new(SelectionCascade::new(store(), lookup.clone()));

    let slow = {
        let cascade = cascade.clone();
        tokio::spawn(async move { cascade.select_product(Some(product("1", "Slow"))).await })
    };
    wait_until_pending(&lookup, "sources:Slow").await;

    let fast = cascade
        .select_product(Some(product("2", "Fast")))
        .await
        .expect("fast");
    assert_eq!(fast, LookupOutcome::Applied);

    let _ = release_slow.send(());
    let slow = slow.await.expect("join").expect("slow");
    assert_eq!(slow, LookupOutcome::Superseded);
    assert_eq!(cascade.sources().get()[0].id, "Fast-source");
}

#[tokio::test]
async fn slower_earlier_port_lookup_never_overwrites_newer_source() {
    let lookup = Arc::new(GatedLookup::default());
    let release_slow = lookup.gate("ports:slow");
    let cascade = Arc::new(SelectionCascade::new(store(), lookup.clone()));
    cascade.select_product(Some(app())).await.expect("sources");

    let slow = {
        let cascade = cascade.clone();
        tokio::spawn(async move {
            cascade
                .select_source(Some(OneOrMany::One(source_in("slow"))))
                .await
        })
    };
    wait_until_pending(&lookup, "ports:slow").await;

    let fast = cascade
        .select_source(Some(OneOrMany::One(source_in("fast"))))
        .await
        .expect("fast");
    assert_eq!(fast, LookupOutcome::Applied);

    let _ = release_slow.send(());
    let slow = slow.await.expect("join").expect("slow");
    assert_eq!(slow, LookupOutcome::Superseded);
    assert_eq!(cascade.ports().get()[0].id, "fast-port");
    assert_eq!(cascade.targets().get()[0].id, "fast-port");
    assert_eq!(cascade.stage().get(), CascadeStage::TargetsLoaded);
}

#[tokio::test]
async fn stale_failure_is_superseded_not_an_error() {
    let lookup = Arc::new(GatedLookup::default());
    let release_slow = lookup.gate("sources:Slow");
    lookup.fail("sources:Slow");
    let cascade = Arc::new(SelectionCascade::new(store(), lookup.clone()));

    let slow = {
        let cascade = cascade.clone();
        tokio::spawn(async move { cascade.select_product(Some(product("1", "Slow"))).await })
    };
    wait_until_pending(&lookup, "sources:Slow").await;

    cascade
        .select_product(Some(product("2", "Fast")))
        .await
        .expect("fast");

    let _ = release_slow.send(());
    let slow = slow.await.expect("join");
    assert!(matches!(slow, Ok(LookupOutcome::Superseded)));
    assert_eq!(cascade.sources().get()[0].id, "Fast-source");
}

#[tokio::test]
async fn product_change_voids_pending_port_lookup() {
    let lookup = Arc::new(GatedLookup::default());
    let release_slow = lookup.gate("ports:slow");
    let cascade = Arc::new(SelectionCascade::new(store(), lookup.clone()));
    cascade.select_product(Some(app())).await.expect("sources");

    let pending = {
        let cascade = cascade.clone();
        tokio::spawn(async move {
            cascade
                .select_source(Some(OneOrMany::One(source_in("slow"))))
                .await
        })
    };
    wait_until_pending(&lookup, "ports:slow").await;

    cascade
        .select_product(Some(product("2", "Db")))
        .await
        .expect("sources");

    let _ = release_slow.send(());
    let pending = pending.await.expect("join").expect("ports");
    assert_eq!(pending, LookupOutcome::Superseded);
    assert!(cascade.ports().get().is_empty());
    assert!(cascade.targets().get().is_empty());
    assert_eq!(cascade.stage().get(), CascadeStage::ProductChosen);
}

#[tokio::test]
async fn failed_lookup_keeps_loaded_sources() {
    let lookup = Arc::new(GatedLookup::default());
    let cascade = SelectionCascade::new(store(), lookup.clone());
    cascade.select_product(Some(app())).await.expect("sources");
    let loaded = cascade.sources().get();

    lookup.fail("sources:Db");
    let err = cascade
        .select_product(Some(product("2", "Db")))
        .await
        .unwrap_err();
    assert!(matches!(err, CascadeError::Lookup(LookupError::Transport(_))));
    assert_eq!(cascade.sources().get(), loaded);
}

#[tokio::test]
async fn clearing_state_resets_cascade_and_voids_pending_lookups() {
    let lookup = Arc::new(GatedLookup::default());
    let release_slow = lookup.gate("ports:slow");
    let cascade = Arc::new(SelectionCascade::new(store(), lookup.clone()));
    cascade.select_product(Some(app())).await.expect("sources");
    cascade
        .select_source(Some(OneOrMany::One(source_in("web"))))
        .await
        .expect("ports");
    assert_eq!(cascade.stage().get(), CascadeStage::TargetsLoaded);

    let pending = {
        let cascade = cascade.clone();
        tokio::spawn(async move {
            cascade
                .select_source(Some(OneOrMany::One(source_in("slow"))))
                .await
        })
    };
    wait_until_pending(&lookup, "ports:slow").await;

    cascade.clear_state();
    let _ = release_slow.send(());
    let pending = pending.await.expect("join").expect("ports");
    assert_eq!(pending, LookupOutcome::Superseded);

    let store = cascade.store();
    assert!(store.selected_product().get().is_none());
    assert!(store.servers().get().is_empty());
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    assert!(cascade.sources().get().is_empty());
    assert!(cascade.ports().get().is_empty());
    assert!(cascade.targets().get().is_empty());
}

#[tokio::test]
async fn new_server_becomes_source_and_restarts_cascade() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    store.set_target_server(Some(store.servers().get()[1].clone()));
    cascade.select_product(Some(app())).await.expect("sources");
    cascade
        .select_source(Some(OneOrMany::One(web_source())))
        .await
        .expect("ports");
    cascade.select_targets(Some(OneOrMany::One(TargetSummary::from(&https_port()))));

    let created = cascade
        .save_server(&ServerDraft::new("Edge", "Rack"))
        .await
        .expect("saved");
    assert_eq!(created.id, 4);
    assert_eq!(store.source_server().get().map(|s| s.name), Some("Edge".to_string()));
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    assert!(store.selected_product().get().is_none());
    assert!(store.selected_source().get().is_none());
    assert!(store.selected_targets().get().is_empty());
    assert!(cascade.ports().get().is_empty());
    assert_eq!(cascade.products().get(), vec![app()]);

    let err = cascade.assign_selected_targets().unwrap_err();
    assert_eq!(
        err,
        AssignError::MissingSelection(vec![MissingSelection::Source, MissingSelection::Targets])
    );
    assert!(store.mappings().get().is_empty());
}

#[tokio::test]
async fn editing_a_server_keeps_the_cascade() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    cascade.select_product(Some(app())).await.expect("sources");

    cascade
        .save_server(&ServerDraft::editing(2, "Edge", "Rack"))
        .await
        .expect("saved");
    assert_eq!(store.selected_product().get(), Some(app()));
    assert_eq!(cascade.stage().get(), CascadeStage::ProductChosen);
}

#[tokio::test]
async fn removing_the_source_server_restarts_cascade() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    let source = store.servers().get()[0].clone();
    cascade.set_source_server(Some(source.clone())).await.expect("products");
    cascade.select_product(Some(app())).await.expect("sources");

    assert!(cascade.remove_server(2).await);
    assert_eq!(cascade.stage().get(), CascadeStage::ProductChosen);

    assert!(cascade.remove_server(source.id).await);
    assert!(store.source_server().get().is_none());
    assert!(store.selected_product().get().is_none());
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    assert!(!cascade.remove_server(source.id).await);
}

#[tokio::test]
async fn source_server_change_restarts_cascade() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    cascade.select_product(Some(app())).await.expect("sources");
    cascade
        .select_source(Some(OneOrMany::One(web_source())))
        .await
        .expect("ports");
    cascade.select_targets(Some(OneOrMany::One(TargetSummary::from(&https_port()))));

    let server = store.servers().get()[2].clone();
    cascade.set_source_server(Some(server.clone())).await.expect("products");
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    assert!(store.selected_product().get().is_none());
    assert!(store.selected_source().get().is_none());
    assert!(store.selected_targets().get().is_empty());
    assert!(cascade.ports().get().is_empty());
    assert_eq!(store.source_server().get(), Some(server.clone()));
    assert_eq!(store.last_modified_server().get(), Some(server));
}

#[tokio::test]
async fn empty_selections_skip_lookups() {
    let store = store();
    let cascade = SelectionCascade::new(store.clone(), Arc::new(catalog()));
    cascade.select_product(Some(app())).await.expect("sources");
    assert_eq!(
        cascade.select_source(Some(OneOrMany::Many(Vec::new()))).await.expect("skip"),
        LookupOutcome::Skipped
    );
    assert_eq!(cascade.stage().get(), CascadeStage::ProductChosen);
    assert_eq!(cascade.select_product(None).await.expect("skip"), LookupOutcome::Skipped);
    assert_eq!(cascade.stage().get(), CascadeStage::NoProduct);
    assert!(cascade.sources().get().is_empty());
}
