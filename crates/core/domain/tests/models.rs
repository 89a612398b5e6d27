use domain::{PortMapping, Server, ServerDraft};

#[test]
fn port_mapping_uses_camel_case_fields() {
    let json = r#"{
        "id": "1700000000000-abc",
        "sourceServer": "Server 1",
        "sourceServerId": "s1",
        "targetServer": "Server 2",
        "product": "App",
        "protocol": "TCP",
        "port": "443",
        "section": "web",
        "description": "https"
    }"#;
    let mapping: PortMapping = serde_json::from_str(json).expect("parse");
    assert_eq!(mapping.source_server, "Server 1");
    assert_eq!(mapping.target_server, "Server 2");
    assert!(mapping.references("Server 2"));
    assert!(!mapping.references("Server 3"));

    let value = serde_json::to_value(&mapping).expect("json");
    assert_eq!(value["sourceServerId"], "s1");
}

#[test]
fn server_copies_do_not_touch_original() {
    let server = Server::new(1, "Server 1", "Location 1");
    let edited = server.with_details("Edge", "Rack");
    assert_eq!(server.name, "Server 1");
    assert_eq!(edited.name, "Edge");
    assert_eq!(edited.id, 1);
}

#[test]
fn editing_draft_keeps_id() {
    let draft = ServerDraft::editing(7, "Server 7", "Location 7")
        .validate()
        .expect("valid");
    assert_eq!(draft.id, Some(7));
}
