//! Request dispatch through the matching trie.

use std::sync::Arc;
use std::time::Duration;

use tree_router::routing::{
    ConstraintContext, ConstraintError, RouteConstraint, RouteContext, RouteDefinition, RouteError,
    TreeRouteBuilder,
};

mod common;
use common::{dispatch, endpoint, router, Declining, Faulty, Slow, Unreachable};

#[tokio::test]
async fn test_literal_route_beats_parameter_route() {
    let router = router(&[("products/{id}", "by-id"), ("products/all", "all")]);

    let (handled, context) = dispatch(&router, "/products/all").await;
    assert!(handled);
    assert_eq!(context.endpoint(), Some("all"));

    let (_, context) = dispatch(&router, "/products/17").await;
    assert_eq!(context.endpoint(), Some("by-id"));
    assert_eq!(context.route_data.values().get("id"), Some("17"));
}

#[tokio::test]
async fn test_catch_all_captures_zero_or_more_segments() {
    let router = router(&[("files/{*path}", "files")]);

    let (handled, context) = dispatch(&router, "/files").await;
    assert!(handled);
    assert_eq!(context.route_data.values().get("path"), Some(""));

    let (_, context) = dispatch(&router, "/files/a/b").await;
    assert_eq!(context.route_data.values().get("path"), Some("a/b"));
}

#[tokio::test]
async fn test_precedence_across_all_child_kinds() {
    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("x/{*rest}", endpoint("catch-all")))
        .route(RouteDefinition::new("x/{*tail}", endpoint("constrained-catch-all")).constraint_expr("tail", "minlength(3)"))
        .route(RouteDefinition::new("x/{p}", endpoint("parameter")))
        .route(RouteDefinition::new("x/{p:int}", endpoint("constrained-parameter")))
        .route(RouteDefinition::new("x/lit", endpoint("literal")))
        .build(1)
        .unwrap();

    let cases = [
        ("/x/lit", "literal"),
        ("/x/5", "constrained-parameter"),
        ("/x/5x", "parameter"),
        ("/x/a/b", "constrained-catch-all"),
        ("/x", "catch-all"),
    ];
    for (path, expected) in cases {
        let (_, context) = dispatch(&router, path).await;
        assert_eq!(context.endpoint(), Some(expected), "path {path}");
    }
}

#[tokio::test]
async fn test_registration_order_breaks_ties() {
    let router = router(&[("{a}", "first"), ("{b}", "second")]);
    let (_, context) = dispatch(&router, "/v").await;
    assert_eq!(context.endpoint(), Some("first"));
}

#[tokio::test]
async fn test_declining_handler_is_rolled_back() {
    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("orders/{id}", Arc::new(Declining)).data_token("area", "orders"))
        .route(RouteDefinition::new("orders/{*rest}", endpoint("fallback")))
        .build(1)
        .unwrap();

    let (handled, context) = dispatch(&router, "/orders/9").await;
    assert!(handled);
    assert_eq!(context.endpoint(), Some("fallback"));
    let values = context.route_data.values();
    assert_eq!(values.get("rest"), Some("9"));
    assert!(!values.contains_key("id"));
    assert!(!values.contains_key("touched"));
    assert!(context.route_data.data_tokens().is_empty());
    assert_eq!(context.route_data.routers().len(), 1);
}

#[tokio::test]
async fn test_nested_router_declines_then_outer_continues() {
    let inner = TreeRouteBuilder::new()
        .route(RouteDefinition::new("api/v1/users", endpoint("users")))
        .build(1)
        .unwrap();
    let outer = TreeRouteBuilder::new()
        .route(RouteDefinition::new("api/{*rest}", Arc::new(inner)))
        .route(RouteDefinition::new("{*all}", endpoint("spa")))
        .build(1)
        .unwrap();

    let (_, context) = dispatch(&outer, "/api/v1/users").await;
    assert_eq!(context.endpoint(), Some("users"));
    assert_eq!(context.route_data.routers().len(), 2);

    let (_, context) = dispatch(&outer, "/api/v2/other").await;
    assert_eq!(context.endpoint(), Some("spa"));
    assert!(!context.route_data.values().contains_key("rest"));
    assert_eq!(context.route_data.values().get("all"), Some("api/v2/other"));
}

#[tokio::test]
async fn test_timed_out_handler_counts_as_declined() {
    let slow = Arc::new(Slow {
        name: "slow",
        delay: Duration::from_secs(5),
    });
    let router = TreeRouteBuilder::new()
        .handler_timeout(Duration::from_millis(20))
        .route(RouteDefinition::new("report/{id}", slow))
        .route(RouteDefinition::new("report/{*rest}", endpoint("cached")))
        .build(1)
        .unwrap();

    let (handled, context) = dispatch(&router, "/report/1").await;
    assert!(handled);
    assert_eq!(context.endpoint(), Some("cached"));
}

#[tokio::test]
async fn test_declined_candidates_keep_prior_endpoint() {
    let slow = Arc::new(Slow {
        name: "slow",
        delay: Duration::from_secs(5),
    });
    let router = TreeRouteBuilder::new()
        .handler_timeout(Duration::from_millis(20))
        .route(RouteDefinition::new("report/{id}", slow))
        .route(RouteDefinition::new("report/{*rest}", Arc::new(Declining)))
        .build(1)
        .unwrap();

    let mut context = RouteContext::for_path("/report/1");
    context.set_endpoint("previous");
    assert!(!router.route_request(&mut context).await.unwrap());
    assert_eq!(context.endpoint(), Some("previous"));
    assert!(context.route_data.values().is_empty());
}

#[tokio::test]
async fn test_handler_fault_propagates_after_rollback() {
    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("boom/{id}", Arc::new(Faulty)))
        .route(RouteDefinition::new("boom/{*rest}", endpoint("never")))
        .build(1)
        .unwrap();

    let mut context = RouteContext::for_path("/boom/1");
    let err = router.route_request(&mut context).await.unwrap_err();
    assert!(matches!(err, RouteError::Handler(_)));
    assert!(context.route_data.values().is_empty());
    assert!(context.endpoint().is_none());
}

#[tokio::test]
async fn test_handler_error_keeps_its_source() {
    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("upstream/{id}", Arc::new(Unreachable)))
        .build(1)
        .unwrap();

    let mut context = RouteContext::for_path("/upstream/3");
    let err = router.route_request(&mut context).await.unwrap_err();
    assert!(matches!(err, RouteError::Source(_)));
    let source = std::error::Error::source(&err).unwrap();
    let io = source.downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    assert!(context.route_data.values().is_empty());
}

#[derive(Debug)]
struct Broken;

impl RouteConstraint for Broken {
    fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError> {
        Err(ConstraintError::new(cx.parameter, "lookup table unavailable"))
    }
}

#[tokio::test]
async fn test_constraint_fault_propagates() {
    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("t/{id}", endpoint("t")).constraint("id", Arc::new(Broken)))
        .build(1)
        .unwrap();

    let mut context = RouteContext::for_path("/t/1");
    let err = router.route_request(&mut context).await.unwrap_err();
    assert!(matches!(err, RouteError::Constraint(_)));
}

#[tokio::test]
async fn test_constraint_sees_request_extensions() {
    #[derive(Debug)]
    struct TenantMatches;

    impl RouteConstraint for TenantMatches {
        fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError> {
            let tenant = cx.extensions.and_then(|e| e.get::<String>());
            Ok(tenant.map(String::as_str) == cx.value())
        }
    }

    let router = TreeRouteBuilder::new()
        .route(RouteDefinition::new("{tenant}/home", endpoint("tenant")).constraint("tenant", Arc::new(TenantMatches)))
        .build(1)
        .unwrap();

    let mut context = RouteContext::for_path("/acme/home");
    context.extensions.insert("acme".to_string());
    assert!(router.route_request(&mut context).await.unwrap());

    let mut context = RouteContext::for_path("/other/home");
    context.extensions.insert("acme".to_string());
    assert!(!router.route_request(&mut context).await.unwrap());
}

#[tokio::test]
async fn test_optional_and_default_segments() {
    let router = router(&[("{controller=Home}/{action=Index}/{id?}", "mvc")]);

    let (_, context) = dispatch(&router, "/").await;
    let values = context.route_data.values();
    assert_eq!(values.get("controller"), Some("Home"));
    assert_eq!(values.get("action"), Some("Index"));
    assert!(!values.contains_key("id"));

    let (_, context) = dispatch(&router, "/Shop/Cart/3").await;
    assert_eq!(context.route_data.values().get("id"), Some("3"));

    let (handled, _) = dispatch(&router, "/a/b/c/d").await;
    assert!(!handled);
}

#[tokio::test]
async fn test_concurrent_dispatch_shares_router() {
    let router = Arc::new(router(&[("items/{id:int}", "item"), ("{*rest}", "other")]));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let path = if i % 2 == 0 { format!("/items/{i}") } else { format!("/items/x{i}") };
                let mut context = RouteContext::for_path(&path);
                router.route_request(&mut context).await.unwrap();
                (i, context.endpoint().map(str::to_string))
            })
        })
        .collect();

    for task in tasks {
        let (i, endpoint) = task.await.unwrap();
        let expected = if i % 2 == 0 { "item" } else { "other" };
        assert_eq!(endpoint.as_deref(), Some(expected));
    }
}
