mod support;

use axum::extract::Request;
use axum::http::{HeaderMap, Method};
use axum_boot::prelude::*;
use std::sync::Mutex;
use support::{context, request, send};
use tower_http::trace::TraceLayer;

struct Catalog {
    titles: Mutex<Vec<String>>,
}

impl Catalog {
    fn with(titles: &[&str]) -> Self {
        Self {
            titles: Mutex::new(titles.iter().map(|t| t.to_string()).collect()),
        }
    }

    fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }

    fn remove(&self, title: &str) -> bool {
        let mut titles = self.titles.lock().unwrap();
        let before = titles.len();
        titles.retain(|t| t != title);
        titles.len() != before
    }
}

#[derive(Injectable)]
struct BookController {
    catalog: Arc<Catalog>,
}

async fn list(this: This<BookController>) -> BaseResp<Vec<String>> {
    BaseResp::ok(this.catalog.titles())
}

async fn remove(Inject(catalog): Inject<Catalog>, Path(name): Path<String>) -> StatusCode {
    if catalog.remove(&name) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn books() -> Controller<BookController> {
    Controller::<BookController>::new("/book")
        .get("", list)
        .nest(Prefix::<()>::new("").delete("/{name}", remove))
}

fn catalog_context(scan: bool) -> BootContext {
    context(scan)
        .register(Catalog::with(&["journey", "outlaws", "kingdoms", "chamber"]))
        .build()
        .unwrap()
}

#[tokio::test]
async fn nested_prefix_mounts_under_controller_path() {
    let ctx = catalog_context(true);
    ctx.controller(books()).unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();

    let (status, _) = send(&app, request(Method::DELETE, "/book/outlaws")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"], serde_json::json!(["journey", "kingdoms", "chamber"]));

    let (status, _) = send(&app, request(Method::GET, "/book/journey")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&app, request(Method::DELETE, "/book/journey/extra")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn declaring_a_controller_twice_mounts_once() {
    let ctx = catalog_context(true);
    let first = ctx.controller(books()).unwrap();
    let second = ctx.controller(books()).unwrap();
    assert_eq!(first, second);

    let app = provide_app(&ctx, None, &[first]).unwrap();
    let (status, _) = send(&app, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::OK);
}

async fn hello() -> &'static str {
    "hello"
}

#[tokio::test]
async fn one_handler_backs_several_function_views() {
    let ctx = context(true).build().unwrap();
    let get_x = ctx.endpoint(Endpoint::get("/x", hello)).unwrap();
    let post_y = ctx.endpoint(Endpoint::post("/y", hello)).unwrap();
    assert_ne!(get_x, post_y);
    // Same handler, path and methods once normalized.
    assert_eq!(ctx.endpoint(Endpoint::get("x/", hello)).unwrap(), get_x);

    let app = provide_app(&ctx, None, &[]).unwrap();
    let (status, body) = send(&app, request(Method::GET, "/x")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "hello"));
    let (status, body) = send(&app, request(Method::POST, "/y")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "hello"));
    let (status, _) = send(&app, request(Method::POST, "/x")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn controller_type_cannot_declare_two_trees() {
    let ctx = context(true).build().unwrap();
    let one = ctx.controller(Controller::<()>::new("/one").get("", hello)).unwrap();
    assert_eq!(ctx.controller(Controller::<()>::new("/one/").get("", hello)).unwrap(), one);

    let err = ctx
        .controller(Controller::<()>::new("/two").get("", hello))
        .unwrap_err();
    assert!(matches!(err, BootError::ConflictingController { .. }));
    let err = ctx
        .controller(Controller::<()>::new("/one").get("", hello).post("", hello))
        .unwrap_err();
    assert!(matches!(err, BootError::ConflictingController { .. }));

    let app = provide_app(&ctx, None, &[]).unwrap();
    let (status, _) = send(&app, request(Method::GET, "/one")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request(Method::GET, "/two")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unlisted_controllers_stay_detached_without_scanning() {
    let ctx = catalog_context(false);
    ctx.controller(books()).unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();
    let (status, _) = send(&app, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let ctx = catalog_context(false);
    let id = ctx.controller(books()).unwrap();
    let app = provide_app(&ctx, None, &[id]).unwrap();
    let (status, _) = send(&app, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::OK);
}

struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn recorder(journal: &Arc<Journal>, name: &'static str) -> impl Middleware {
    let journal = Arc::clone(journal);
    from_fn(move |request: Request, next: Next| {
        let journal = Arc::clone(&journal);
        async move {
            journal.push(format!("{name}-pre"));
            let response = next.run(request).await;
            journal.push(format!("{name}-post"));
            response
        }
    })
}

#[derive(Injectable)]
struct AuditController;

async fn audited(Inject(journal): Inject<Journal>) -> &'static str {
    journal.push("handler");
    "audited"
}

#[tokio::test]
async fn middleware_wraps_in_onion_order() {
    let journal = Arc::new(Journal(Mutex::new(Vec::new())));
    let ctx = context(true)
        .register_arc(None, Arc::clone(&journal))
        .build()
        .unwrap();
    ctx.controller(
        Controller::<AuditController>::new("/audit")
            .use_http_middleware(recorder(&journal, "A"))
            .use_http_middleware(recorder(&journal, "B"))
            .get("/{id}", audited)
            .nest(Prefix::<()>::new("/inner").get("", audited)),
    )
    .unwrap();
    ctx.endpoint(Endpoint::get("/free", audited)).unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();

    let (status, body) = send(&app, request(Method::GET, "/audit/7")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "audited"));
    assert_eq!(
        journal.take(),
        vec!["B-pre", "A-pre", "handler", "A-post", "B-post"]
    );

    // Middleware covers the direct endpoints of its scope only.
    send(&app, request(Method::GET, "/audit/inner")).await;
    assert_eq!(journal.take(), vec!["handler"]);
    send(&app, request(Method::GET, "/free")).await;
    assert_eq!(journal.take(), vec!["handler"]);
}

#[tokio::test]
async fn composed_records_keep_declaration_order() {
    let journal = Arc::new(Journal(Mutex::new(Vec::new())));
    let ctx = context(true)
        .register_arc(None, Arc::clone(&journal))
        .build()
        .unwrap();
    let record = UseMiddlewareRecord::http(recorder(&journal, "A"))
        + UseMiddlewareRecord::http(recorder(&journal, "B"));
    ctx.controller(
        Controller::<AuditController>::new("")
            .use_middleware(record)
            .post("/audit", audited),
    )
    .unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();

    let (status, _) = send(&app, request(Method::POST, "/audit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        journal.take(),
        vec!["B-pre", "A-pre", "handler", "A-post", "B-post"]
    );
}

#[derive(Injectable)]
struct GreetController {
    #[inject(default)]
    greeting: String,
}

async fn greet(this: This<GreetController>) -> Result<String> {
    let user = this.dep::<String>("user")?;
    Ok(format!("{}hello {user}", this.greeting))
}

fn user_header() -> UseDep {
    UseDep::from_fn(|headers: HeaderMap| async move {
        headers
            .get("x-user")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(StatusCode::UNAUTHORIZED)
    })
}

#[tokio::test]
async fn use_dependencies_reach_every_direct_endpoint() {
    let ctx = context(true).build().unwrap();
    ctx.controller(
        Controller::<GreetController>::new("/greet")
            .use_dep("user", user_header())
            .get("", greet)
            .post("/again", greet),
    )
    .unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();

    let mut authorized = request(Method::GET, "/greet");
    authorized
        .headers_mut()
        .insert("x-user", "wukong".parse().unwrap());
    let (status, body) = send(&app, authorized).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "hello wukong"));

    let mut again = request(Method::POST, "/greet/again");
    again.headers_mut().insert("x-user", "bajie".parse().unwrap());
    let (_, body) = send(&app, again).await;
    assert_eq!(body, "hello bajie");

    let (status, _) = send(&app, request(Method::GET, "/greet")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[derive(Injectable)]
struct BrokenController {
    #[allow(dead_code)]
    limit: usize,
}

#[tokio::test]
async fn unresolvable_controller_aborts_bootstrap() {
    let ctx = context(true).build().unwrap();
    ctx.controller(Controller::<BrokenController>::new("/broken").get("", || async { "never" }))
        .unwrap();

    let err = provide_app(&ctx, None, &[]).unwrap_err();
    assert!(matches!(err, BootError::InjectFail { ref param, .. } if param == "limit"));
}

#[derive(Debug)]
struct Missing(String);

struct Shelved;

async fn find(
    Inject(catalog): Inject<Catalog>,
    Path(name): Path<String>,
) -> std::result::Result<String, Raised<Missing>> {
    if catalog.titles().contains(&name) {
        Ok(name)
    } else {
        Err(Missing(name).into())
    }
}

async fn shelved() -> std::result::Result<String, Raised<Shelved>> {
    Err(Raised(Shelved))
}

#[tokio::test]
async fn exception_handlers_map_raised_errors_by_type() {
    let ctx = catalog_context(true);
    ctx.exception_handler(|missing: &Missing| {
        (
            StatusCode::OK,
            Json(serde_json::json!({"code": 404, "msg": format!("{} not found", missing.0)})),
        )
    });
    ctx.controller(
        Controller::<()>::new("/find")
            .get("/{name}", find)
            .get("/shelved/all", shelved),
    )
    .unwrap();
    let app = provide_app(&ctx, None, &[]).unwrap();

    let (status, body) = send(&app, request(Method::GET, "/find/journey")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "journey"));

    let (status, body) = send(&app, request(Method::GET, "/find/dream")).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, serde_json::json!({"code": 404, "msg": "dream not found"}));

    // No handler for this type: the raised error stays a 500.
    let (status, _) = send(&app, request(Method::GET, "/find/shelved/all")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn app_ready_callbacks_run_in_order_on_the_attached_router() {
    let ctx = catalog_context(true);
    ctx.controller(books()).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    ctx.on_app_ready(move |app| {
        first.lock().unwrap().push("fbv");
        app.route(
            "/fbv",
            axum::routing::delete(|Inject(catalog): Inject<Catalog>| async move {
                format!("fbv_delete {}", catalog.titles().len())
            }),
        )
    });
    let second = Arc::clone(&order);
    ctx.on_app_ready(move |app| {
        second.lock().unwrap().push("done");
        app
    });
    assert!(order.lock().unwrap().is_empty());

    let app = provide_app(&ctx, None, &[]).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["fbv", "done"]);

    let (status, body) = send(&app, request(Method::DELETE, "/fbv")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "fbv_delete 4"));
    let (status, _) = send(&app, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn application_builder_extends_an_existing_router() {
    let ctx = catalog_context(false);
    let id = ctx.controller(books()).unwrap();
    let app = Application::builder()
        .context(ctx)
        .router(
            Router::new()
                .route("/health", axum::routing::get(|| async { "up" }))
                .layer(TraceLayer::new_for_http()),
        )
        .controller(id)
        .build()
        .unwrap();

    assert!(app.context().lookup::<Catalog>(None).is_some());
    let router = app.into_router();
    let (_, body) = send(&router, request(Method::GET, "/health")).await;
    assert_eq!(body, "up");
    let (status, _) = send(&router, request(Method::GET, "/book")).await;
    assert_eq!(status, StatusCode::OK);
}
