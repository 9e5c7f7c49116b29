use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use filehost::accounts::AccountStore;
use filehost::catalog::{FileCatalog, FileRecord};
use filehost::templates::Templates;
use filehost::web::{self, AppState, WebSettings};
use filehost::{MemoryStore, Operation, OperationKind, SessionCookieCommand, SessionId};
use rand::distributions::{Alphanumeric, DistString};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// bcrypt("example")
const EXAMPLE_HASH: &str = "$2a$10$ITkHbQjRK6AWs.InpysH5em2Lx4jwzmyYOpvFSturS7hRe6oxzUAu";
const BOUNDARY: &str = "filehost-test-boundary";

struct TestApp {
    store: Arc<MemoryStore>,
    state: AppState,
    files_dir: PathBuf,
}

impl TestApp {
    fn new() -> Self {
        Self::with_max_file_size(1024 * 1024)
    }

    fn with_max_file_size(max_file_size: u64) -> Self {
        let files_dir = std::env::temp_dir().join(format!(
            "filehost-test-{}",
            Alphanumeric.sample_string(&mut rand::thread_rng(), 12)
        ));
        std::fs::create_dir_all(&files_dir).unwrap();
        let store = Arc::new(MemoryStore::new_with_logger());
        store.add_user("example", EXAMPLE_HASH, "Europe/Moscow", 5);
        let settings = WebSettings {
            files_dir: files_dir.clone(),
            max_file_size,
            ..WebSettings::default()
        };
        let state = AppState::new(
            Arc::clone(&store),
            Templates::embedded().unwrap(),
            settings,
        );
        Self {
            store,
            state,
            files_dir,
        }
    }

    fn router(&self) -> Router {
        web::router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    /// A session cookie for `example`, issued without going through bcrypt.
    async fn login(&self) -> String {
        let SessionCookieCommand::Set { cookie_value, .. } =
            self.state.sessions.issue("example").await.unwrap()
        else {
            panic!("issuing always sets a cookie")
        };
        self.store.clear_operations();
        cookie_value
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, format!("session_id={cookie}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, form: &str) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_owned()))
            .unwrap();
        self.send(request).await
    }

    async fn upload(&self, cookie: &str, fields: &[(&str, &str)], file: &str) -> Response<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"uploaded_file\"; filename=\"notes.txt\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{file}\r\n--{BOUNDARY}--\r\n"
        ));
        self.upload_body(cookie, body).await
    }

    async fn upload_body(&self, cookie: &str, body: String) -> Response<Body> {
        let request = Request::post("/upload")
            .header(header::COOKIE, format!("session_id={cookie}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.files_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.files_dir);
    }
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap())
}

fn example_file(id: u64, rating: i64) -> FileRecord {
    FileRecord {
        id,
        label: format!("file number {id} with a long label"),
        size_bytes: 1024,
        description: "a description that is longer than thirty-five characters".to_owned(),
        owner: "example".to_owned(),
        category: "music".to_owned(),
        uploaded_at: Utc.with_ymd_and_hms(2009, 11, 17, 20, 34, 58).unwrap(),
        rating,
    }
}

#[tokio::test]
async fn login_success_sets_session_cookie() {
    let app = TestApp::new();
    let response = app
        .post_form("/login", "username=example&password=example")
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cookie = set_cookie(&response).unwrap();
    let value = cookie
        .strip_prefix("session_id=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();
    assert_eq!(value.len(), 60);
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert_eq!(
        app.store.session_owner(&SessionId::from_cookie_value(value)).as_deref(),
        Some("example")
    );

    // the cookie opens protected pages
    let response = app.get("/", Some(value)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_wrong_password() {
    let app = TestApp::new();
    let response = app
        .post_form("/login", "username=example&password=example_changed")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    let body = body_text(response).await;
    assert!(body.contains(r#"<h2 style="color:red">Wrong username or password</h2>"#));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn login_unknown_user_looks_like_wrong_password() {
    let app = TestApp::new();
    let response = app
        .post_form("/login", "username=nobody&password=example")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Wrong username or password"));
}

#[tokio::test]
async fn login_form_validation() {
    let app = TestApp::new();
    let cases = [
        ("username=&password=example", "Username cannot be empty"),
        ("username=example&password=", "Password cannot be empty"),
        (
            "username=example_larger_than_20_characters&password=example",
            "Username cannot be longer than 20 characters",
        ),
        (
            "username=example&password=password_larger_than_40_characters_____________",
            "Password cannot be longer than 40 characters",
        ),
        ("username=Example&password=example", "Please use lower case username"),
    ];
    for (form, warning) in cases {
        let response = app.post_form("/login", form).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(
            body.contains(&format!(r#"<h2 style="color:red">{warning}</h2>"#)),
            "{form}: {body}"
        );
    }
    // validation happens before any lookup
    assert!(app.store.operations().is_empty());
}

#[tokio::test]
async fn login_keeps_username_on_warning() {
    let app = TestApp::new();
    let response = app.post_form("/login", "username=Example&password=x").await;
    assert!(body_text(response).await.contains(r#"value="Example""#));
}

#[tokio::test]
async fn login_session_insert_failure() {
    let app = TestApp::new();
    app.store.fail_on(OperationKind::CreateSession);
    let response = app
        .post_form("/login", "username=example&password=example")
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie(&response).is_none());
    assert_eq!(body_text(response).await, "INTERNAL ERROR. Please try later\n");
}

#[tokio::test]
async fn login_password_lookup_failure() {
    let app = TestApp::new();
    app.store.fail_on(OperationKind::PasswordHash);
    let response = app
        .post_form("/login", "username=example&password=example")
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn gate_redirects_without_session() {
    let app = TestApp::new();
    for uri in ["/", "/recent", "/upload", "/categories", "/users", "/download?id=1"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&response), "/login");
    }

    let response = app.get("/users", Some("too-short")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(app.store.operations().is_empty());

    let unknown = "u".repeat(60);
    let response = app.get("/users", Some(&unknown)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.store.operations().len(), 1);
}

#[tokio::test]
async fn gate_store_failure_is_internal_error() {
    let app = TestApp::new();
    let cookie = app.login().await;
    app.store.fail_on(OperationKind::ReadSession);

    let response = app.get("/users", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "INTERNAL ERROR. Please try later\n");
}

#[tokio::test]
async fn login_and_registration_are_open() {
    let app = TestApp::new();
    assert_eq!(app.get("/login", None).await.status(), StatusCode::OK);
    assert_eq!(app.get("/registration", None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_session() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    let removal = set_cookie(&response).unwrap();
    assert!(removal.starts_with("session_id=;"));
    assert!(removal.contains("Max-Age=0"));
    assert!(app.store.is_empty());

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn logout_without_cookie() {
    let app = TestApp::new();
    let response = app.get("/logout", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(set_cookie(&response).is_none());
    assert!(app.store.operations().is_empty());
}

#[tokio::test]
async fn logout_store_failure_keeps_cookie() {
    let app = TestApp::new();
    let cookie = app.login().await;
    app.store.fail_on(OperationKind::DeleteSession);

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie(&response).is_none());
    assert!(!app.store.is_empty());
}

#[tokio::test]
async fn popular_page_formats_rows() {
    let app = TestApp::new();
    app.store.add_file(example_file(1, 3));
    app.store.add_file(example_file(2, 0));
    let cookie = app.login().await;

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("0.0010 MB"));
    assert!(body.contains("1024 Bytes"));
    assert!(body.contains("2009-11-17 23:34:58"));
    assert!(body.contains(r#"href="/download?id=1""#));
    assert!(body.contains("file number 1 with a..."));
    assert!(body.contains("a description that is longer than t..."));
    assert!(!body.contains("/download?id=2"));

    // one timezone lookup for the whole page
    let timezone_lookups = app
        .store
        .operations()
        .into_iter()
        .filter(|operation| matches!(operation, Operation::Timezone { .. }))
        .count();
    assert_eq!(timezone_lookups, 1);
}

#[tokio::test]
async fn recent_and_category_listings() {
    let app = TestApp::new();
    app.store.add_file(example_file(1, 0));
    let cookie = app.login().await;

    let body = body_text(app.get("/recent", Some(&cookie)).await).await;
    assert!(body.contains("/download?id=1"));

    let body = body_text(app.get("/categories", Some(&cookie)).await).await;
    assert!(body.contains(r#"href="/categories/music""#));

    let body = body_text(app.get("/categories/music", Some(&cookie)).await).await;
    assert!(body.contains("/download?id=1"));

    let body = body_text(app.get("/categories/games", Some(&cookie)).await).await;
    assert!(!body.contains("/download?id=1"));

    let response = app.get("/categories/movies", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_with_broken_timezone_is_internal_error() {
    let app = TestApp::new();
    app.store.add_user("example", EXAMPLE_HASH, "Mars/Olympus", 0);
    let cookie = app.login().await;
    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn users_page_ranks_by_rating() {
    let app = TestApp::new();
    app.store.add_user("low", EXAMPLE_HASH, "UTC", 1);
    app.store.add_user("high", EXAMPLE_HASH, "UTC", 9);
    let cookie = app.login().await;

    let body = body_text(app.get("/users", Some(&cookie)).await).await;
    let high = body.find("<td>high</td>").unwrap();
    let example = body.find("<td>example</td>").unwrap();
    let low = body.find("<td>low</td>").unwrap();
    assert!(high < example && example < low);
}

#[tokio::test]
async fn registration_checks_form() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/registration",
            "username=newuser&password=secret&password_confirm=other&timezone=UTC",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Passwords doesn&#x27;t match"));

    let response = app
        .post_form(
            "/registration",
            "username=newuser&password=secret&password_confirm=secret&timezone=Mars%2FOlympus",
        )
        .await;
    assert!(body_text(response).await.contains("Unknown timezone"));

    let response = app
        .post_form(
            "/registration",
            "username=example&password=secret&password_confirm=secret&timezone=UTC",
        )
        .await;
    assert!(body_text(response).await.contains("Username already used"));
}

#[tokio::test]
async fn registration_creates_user() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/registration",
            "username=newuser&password=secret&password_confirm=secret&timezone=Europe%2FBerlin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert_eq!(
        app.store.timezone("newuser").await.unwrap().as_deref(),
        Some("Europe/Berlin")
    );
    let hashword = app.store.password_hash("newuser").await.unwrap().unwrap();
    assert!(filehost::password::verify(&hashword, "secret").is_success());
}

#[tokio::test]
async fn upload_stores_file() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .upload(
            &cookie,
            &[("filename", ""), ("description", "some notes"), ("category", "documents")],
            "hello world",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains(r#"<h2 style="color:green">FILE SUCCEEDED UPLOADED</h2>"#));

    let file = app.store.file(1).await.unwrap().unwrap();
    assert_eq!(file.label, "notes.txt");
    assert_eq!(file.size_bytes, 11);
    assert_eq!(file.owner, "example");
    assert_eq!(file.category, "documents");
    assert_eq!(file.rating, 0);
    assert_eq!(app.stored_files(), ["1"]);
    assert_eq!(
        std::fs::read_to_string(app.files_dir.join("1")).unwrap(),
        "hello world"
    );
}

#[tokio::test]
async fn upload_validation() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let long_name = "f".repeat(51);
    let long_description = "d".repeat(501);
    let cases = [
        (
            [("filename", long_name.as_str()), ("description", ""), ("category", "other")],
            "Filename are too long",
        ),
        (
            [("filename", "a"), ("description", long_description.as_str()), ("category", "other")],
            "Description are too long",
        ),
        (
            [("filename", "a"), ("description", ""), ("category", "movies")],
            "Unknown category",
        ),
    ];
    for (fields, warning) in cases {
        let body = body_text(app.upload(&cookie, &fields, "content").await).await;
        assert!(body.contains(&format!(r#"<h2 style="color:red">{warning}</h2>"#)));
    }
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn upload_too_large() {
    let app = TestApp::with_max_file_size(16);
    let cookie = app.login().await;

    let body = body_text(
        app.upload(
            &cookie,
            &[("filename", "big"), ("description", ""), ("category", "other")],
            &"x".repeat(17),
        )
        .await,
    )
    .await;
    assert!(body.contains("Filesize more than 1GB"));
    assert!(app.stored_files().is_empty());
}

/// Text parts are cut off long before the file size limit applies.
#[tokio::test]
async fn upload_oversized_text_field() {
    let app = TestApp::with_max_file_size(16);
    let cookie = app.login().await;
    let description = "d".repeat(1024 * 1024);

    let response = app
        .upload(
            &cookie,
            &[("filename", "a"), ("description", description.as_str()), ("category", "other")],
            "content",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains(r#"<h2 style="color:red">Description are too long</h2>"#));
    assert!(app.stored_files().is_empty());
    assert!(app.store.file(1).await.unwrap().is_none());
}

/// A file received before a rejected text part does not stay behind.
#[tokio::test]
async fn upload_rejected_after_file_leaves_nothing() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"uploaded_file\"; filename=\"notes.txt\"\r\n\
         Content-Type: application/octet-stream\r\n\r\ncontent\r\n\
         --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"filename\"\r\n\r\n{}\r\n--{BOUNDARY}--\r\n",
        "f".repeat(64 * 1024)
    );

    let text = body_text(app.upload_body(&cookie, body).await).await;
    assert!(text.contains(r#"<h2 style="color:red">Filename are too long</h2>"#));
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn upload_insert_failure() {
    let app = TestApp::new();
    let cookie = app.login().await;
    app.store.fail_on(OperationKind::InsertFile);

    let response = app
        .upload(
            &cookie,
            &[("filename", "a"), ("description", ""), ("category", "other")],
            "content",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains(r#"<h2 style="color:red">INTERNAL ERROR. Please try later</h2>"#));
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn download_page_and_file() {
    let app = TestApp::new();
    app.store.add_file(example_file(4, 2));
    std::fs::write(app.files_dir.join("4"), "file body").unwrap();
    let cookie = app.login().await;

    let response = app.get("/download?id=4", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("0.000977 MB"));
    assert!(body.contains("2009-11-17 23:34:58"));
    assert!(body.contains(r#"href="/files/4""#));

    let response = app.get("/files/4", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"file number 4 with a long label\""
    );
    assert_eq!(body_text(response).await, "file body");

    let response = app.get("/download?id=99", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/files/99", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
