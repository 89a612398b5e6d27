use api_contract::{PortRequest, SourceRequest};
use domain::{CandidatePort, Product, SourceService};
use portmap_lookup::{InMemoryLookup, LookupSource};

#[tokio::test]
async fn catalog_resolves_each_stage() {
    let source = SourceService {
        id: "s1".to_string(),
        from_port: "80".to_string(),
        product: "App".to_string(),
        section: "web".to_string(),
    };
    let port = CandidatePort {
        id: "p1".to_string(),
        product: "App".to_string(),
        from_port: "80".to_string(),
        to_port: "443".to_string(),
        protocol: "TCP".to_string(),
        port: "443".to_string(),
        section: "web".to_string(),
        description: "https".to_string(),
    };
    let lookup = InMemoryLookup::new()
        .with_products(vec![Product {
            id: "1".to_string(),
            name: "App".to_string(),
        }])
        .with_sources("App", vec![source.clone()])
        .with_ports(&source, "App", vec![port.clone()]);

    assert_eq!(lookup.list_products().await.expect("products").len(), 1);
    let sources = lookup
        .list_sources(&SourceRequest {
            product_name: "App".to_string(),
        })
        .await
        .expect("sources");
    assert_eq!(sources, vec![source.clone()]);
    let ports = lookup
        .list_ports(&PortRequest::for_source(&source, "App"))
        .await
        .expect("ports");
    assert_eq!(ports, vec![port]);

    let unknown = lookup
        .list_sources(&SourceRequest {
            product_name: "Other".to_string(),
        })
        .await
        .expect("sources");
    assert!(unknown.is_empty());
}
