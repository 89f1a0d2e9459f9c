use std::{collections::HashMap, sync::Arc};

use serde_json::json;
use upward_engine::{
    AmbiguityPolicy, Context, Definition, Engine, IoCapabilities, MockFetch, ResolveError, ResolverRegistry, parse_definition_file,
};

const STOREFRONT: &str = r#"
status:
  when:
    - matches: request.url.pathname
      pattern: '^/api'
      use: 200
  default:
    inline: 404
cartId:
  env: CART_ID
greeting:
  template: "Hello ${{ customer.firstname }}, your cart is ${{ cartId }}"
cart:
  url:
    env: GRAPHQL_URL
    default: https://shop.example/graphql
  query: 'query Cart($id: String!) { cart(cart_id: $id) { total } }'
  variables:
    id: cartId
headers:
  content-type: application/json
  cache:
    - public
    - max-age=60
"#;

fn engine(fetch: &Arc<MockFetch>) -> Engine {
    let environment = HashMap::from([("CART_ID".to_string(), "c-17".to_string())]);
    Engine::new(IoCapabilities::new(fetch.clone()).with_environment(Arc::new(environment)))
}

fn request_context(pathname: &str) -> Context {
    Context::from_values([
        ("request".to_string(), json!({"url": {"pathname": pathname}})),
        ("customer".to_string(), json!({"firstname": "Ada"})),
    ])
}

#[tokio::test]
async fn test_storefront_document_resolves() {
    let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {"cart": {"total": 42}}})));
    let definition: Definition = serde_yaml::from_str(STOREFRONT).unwrap();

    let resolved = engine(&fetch).resolve(&definition, request_context("/api/cart")).await.unwrap();

    assert_eq!(
        resolved,
        json!({
            "status": 200,
            "cartId": "c-17",
            "greeting": "Hello Ada, your cart is c-17",
            "cart": {"data": {"cart": {"total": 42}}},
            "headers": {
                "content-type": "application/json",
                "cache": ["public", "max-age=60"]
            }
        })
    );

    let requests = fetch.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://shop.example/graphql");
    let body: serde_json::Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["variables"], json!({"id": "c-17"}));
    assert_eq!(body["operationName"], json!("Cart"));
}

#[tokio::test]
async fn test_conditional_falls_back_to_default() {
    let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {}})));
    let definition: Definition = serde_yaml::from_str(STOREFRONT).unwrap();

    let resolved = engine(&fetch).resolve(&definition, request_context("/home")).await.unwrap();
    assert_eq!(resolved["status"], json!(404));
}

#[tokio::test]
async fn test_first_failure_fails_the_document() {
    let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {}})));
    let definition: Definition = serde_yaml::from_str(STOREFRONT).unwrap();

    // Without `customer` the greeting cannot render.
    let context = Context::from_values([("request".to_string(), json!({"url": {"pathname": "/api"}}))]);
    let error = engine(&fetch).resolve(&definition, context).await.unwrap_err();
    assert_eq!(error, ResolveError::key_not_found("customer.firstname"));
}

#[tokio::test]
async fn test_sibling_field_resolves_once() {
    let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {"me": {"id": "u-1"}}})));
    let definition = Definition::from(json!({
        "viewer": {"url": "https://a", "query": "{ me { id } }"},
        "first": {"template": "${{ viewer.data.me.id }}"},
        "second": {"template": "${{ viewer.data.me.id }}!"}
    }));

    let resolved = engine(&fetch).resolve(&definition, Context::new()).await.unwrap();

    assert_eq!(resolved["first"], json!("u-1"));
    assert_eq!(resolved["second"], json!("u-1!"));
    assert_eq!(fetch.call_count(), 1);
}

#[tokio::test]
async fn test_ambiguous_definition_policy() {
    let fetch = Arc::new(MockFetch::new());
    let definition = Definition::from(json!({"value": {"inline": "literal", "env": "HOME"}}));

    let resolved = engine(&fetch).resolve(&definition, Context::new()).await.unwrap();
    assert_eq!(resolved, json!({"value": "literal"}));

    let strict = engine(&fetch).with_registry(ResolverRegistry::standard().with_policy(AmbiguityPolicy::Error));
    let error = strict.resolve(&definition, Context::new()).await.unwrap_err();
    assert!(matches!(error, ResolveError::AmbiguousDefinition { ref kinds, .. } if kinds == "inline, env"));
}

#[tokio::test]
async fn test_definition_file_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("upward.yml");
    std::fs::write(&path, STOREFRONT).unwrap();

    let fetch = Arc::new(MockFetch::new().with_json(json!({"data": {"cart": null}})));
    let definition = parse_definition_file(&path).unwrap();
    let resolved = engine(&fetch).resolve(&definition, request_context("/api")).await.unwrap();
    assert_eq!(resolved["cart"], json!({"data": {"cart": null}}));
}
