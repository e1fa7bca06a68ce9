//! Mock files on disk through to repository lookups.

use mockwire::activity::{ActivityEntry, ActivityLog, ActivitySink};
use mockwire::mock::{FaultTag, MockLibrary, ServiceType};
use mockwire::{MatchConfig, MatchRepository, MockNode};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const REST_MOCKS: &str = r#"[
  {
    "url": "/api/customers/(*)",
    "methodName": "GET",
    "description": "customer by id",
    "response": { "statusCode": 200, "body": "{\"name\":\"Ann\"}" }
  },
  {
    "url": "/api/customers",
    "methodName": "POST",
    "description": "create retail",
    "request": { "body": "{\"customer\":{\"type\":\"retail\"}}" },
    "response": { "statusCode": 201, "body": "retail" }
  },
  {
    "url": "/api/customers",
    "methodName": "POST",
    "description": "create business",
    "request": { "body": "{\"customer\":{\"type\":\"business\"}}" },
    "response": { "statusCode": 201, "body": "business" }
  }
]"#;

const SOAP_MOCKS: &str = r#"
- url: /ws/quotes
  methodName: GetQuote
  serviceType: SOAP
  description: quote
  response:
    body: <Quote>42</Quote>
"#;

fn repository_with_rest_paths(dir: &Path) -> Arc<MatchRepository> {
    let rest = dir.join("rest.json");
    fs::write(&rest, r#"{"/api/customers": {"POST": ["customer.type"]}}"#).unwrap();
    let config = MatchConfig::load(&rest, &dir.join("missing-soap.json")).unwrap();
    Arc::new(MatchRepository::new(config))
}

fn label(
    repository: &MatchRepository,
    st: ServiceType,
    url: &str,
    method: &str,
    body: &str,
) -> Option<String> {
    repository
        .get_mock(st, url, method, body)
        .unwrap()
        .map(|m| m.label().to_string())
}

#[test]
fn test_directory_load_serves_lookups() {
    let config_dir = tempfile::tempdir().unwrap();
    let mocks_dir = tempfile::tempdir().unwrap();
    fs::write(mocks_dir.path().join("rest.json"), REST_MOCKS).unwrap();
    fs::create_dir(mocks_dir.path().join("soap")).unwrap();
    fs::write(mocks_dir.path().join("soap/quotes.yaml"), SOAP_MOCKS).unwrap();
    fs::write(mocks_dir.path().join("README.md"), "not a mock").unwrap();

    let repository = repository_with_rest_paths(config_dir.path());
    let library = MockLibrary::new(Arc::clone(&repository));
    let report = library.load_directory(mocks_dir.path()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.loaded.len(), 2);

    let stats = repository.stats();
    assert_eq!(stats.mocks, 4);
    assert_eq!(stats.dynamic_paths, 1);

    assert_eq!(
        label(&repository, ServiceType::Rest, "/api/customers/77", "GET", ""),
        Some("customer by id".to_string())
    );
    assert_eq!(
        label(
            &repository,
            ServiceType::Rest,
            "/api/customers",
            "POST",
            r#"{"customer": {"type": "business", "name": "Acme"}}"#
        ),
        Some("create business".to_string())
    );
    assert_eq!(
        label(&repository, ServiceType::Soap, "/ws/quotes", "GetQuote", "<x/>"),
        Some("quote".to_string())
    );
}

#[test]
fn test_edit_save_and_reload() {
    let mocks_dir = tempfile::tempdir().unwrap();
    let path = mocks_dir.path().join("rest.json");
    fs::write(&path, REST_MOCKS).unwrap();

    let repository = Arc::new(MatchRepository::default());
    let library = MockLibrary::new(Arc::clone(&repository));
    library.load_directory(mocks_dir.path()).unwrap();

    library.set_fault(&path, 0, Some(FaultTag::TimeOut)).unwrap();
    library
        .add_mock(&path, MockNode::rest("/api/health", "GET").with_response(204, ""))
        .unwrap();
    assert_eq!(library.is_dirty(&path), Some(true));
    library.save_file(&path).unwrap();

    let fresh = Arc::new(MatchRepository::default());
    let reloaded = MockLibrary::new(Arc::clone(&fresh));
    reloaded.load_directory(mocks_dir.path()).unwrap();
    let mock = fresh
        .get_mock(ServiceType::Rest, "/api/customers/1", "GET", "")
        .unwrap()
        .unwrap();
    assert_eq!(mock.simulate_exception, Some(FaultTag::TimeOut));
    assert!(fresh.is_mock_exists("/api/health", "GET"));
}

#[test]
fn test_activity_export_against_loaded_mocks() {
    let mocks_dir = tempfile::tempdir().unwrap();
    fs::write(mocks_dir.path().join("rest.json"), REST_MOCKS).unwrap();
    let repository = Arc::new(MatchRepository::default());
    MockLibrary::new(Arc::clone(&repository))
        .load_directory(mocks_dir.path())
        .unwrap();

    let log = ActivityLog::new(10);
    for url in ["/api/customers/5", "/api/unknown"] {
        let mut entry = ActivityEntry::new(url, "GET");
        entry.service_type = Some(ServiceType::Rest);
        entry.status = Some(200);
        log.record(&entry);
    }

    let exported = log.export(&repository);
    let flags: Vec<(String, bool)> = exported
        .into_iter()
        .map(|e| (e.mock.url, e.is_new))
        .collect();
    assert_eq!(
        flags,
        vec![
            ("/api/customers/5".to_string(), false),
            ("/api/unknown".to_string(), true)
        ]
    );
}
