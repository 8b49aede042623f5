use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use dirheader::body::Body;
use dirheader::response::{IntoResponse, Response};
use dirheader::service::Service;
use dirheader::static_file::ServeDir;
use dirheader::Locale;
use http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;

fn fixture() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    fs::create_dir(&bin).unwrap();

    let busybox = File::create(bin.join("busybox")).unwrap();
    busybox.set_len(1241141).unwrap();
    busybox
        .set_modified(UNIX_EPOCH + Duration::from_secs(12124121))
        .unwrap();

    fs::create_dir(bin.join("lib")).unwrap();
    File::open(bin.join("lib"))
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(12144121))
        .unwrap();

    fs::write(tmp.path().join("hello.txt"), "hello, world").unwrap();
    tmp
}

async fn get(service: &ServeDir, uri: &str) -> Response {
    request(service, Request::get(uri).body(()).unwrap()).await
}

async fn request(service: &ServeDir, req: Request<()>) -> Response {
    match service.call(req).await {
        Ok(res) => res,
        Err(e) => e.into_response(),
    }
}

async fn text(res: Response) -> String {
    let body = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn content_type(res: &Response) -> &str {
    res.headers()[header::CONTENT_TYPE].to_str().unwrap()
}

#[tokio::test]
async fn html_listing_by_default() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/bin/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "text/html; charset=utf-8");

    let page = text(res).await;
    assert!(page.contains("<title>Index of /bin/</title>"));
    assert!(page.contains("[parent directory]"));
    let busybox = page.find(r#"href="busybox""#).unwrap();
    let lib = page.find(r#"href="lib/""#).unwrap();
    assert!(busybox < lib);
}

#[tokio::test]
async fn unknown_format_is_html() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/bin/?format=xml").await;
    assert_eq!(content_type(&res), "text/html; charset=utf-8");
}

#[tokio::test]
async fn json_listing() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/bin/?format=json").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "application/json");

    let listing: dirheader::Listing = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(listing.header.title, "Index of /bin/");
    assert_eq!(listing.rows.len(), 2);

    let busybox = &listing.rows[0];
    assert_eq!(busybox.name, "busybox");
    assert!(!busybox.is_dir);
    assert_eq!(busybox.size, 1241141);
    assert_eq!(busybox.date_modified, 12124121);
    assert!(!busybox.size_string.is_empty());

    let lib = &listing.rows[1];
    assert_eq!(lib.name, "lib");
    assert!(lib.is_dir);
    assert_eq!(lib.date_modified, 12144121);
}

#[tokio::test]
async fn simple_listing() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/?format=simple").await;
    assert_eq!(content_type(&res), "text/plain");
    assert_eq!(text(res).await, "bin/\nhello.txt\n");
}

#[tokio::test]
async fn root_has_no_parent_link() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path()).locale(Locale::Zh);

    let res = get(&service, "/").await;
    let page = text(res).await;
    assert!(page.contains("/ 的索引"));
    assert!(!page.contains("[上级目录]"));
}

#[tokio::test]
async fn directory_without_slash_redirects() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/bin?format=json").await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "bin/?format=json");
}

#[tokio::test]
async fn redirect_stays_on_host() {
    let tmp = fixture();
    fs::create_dir(tmp.path().join("evil.example")).unwrap();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "//evil.example").await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "evil.example/");
}

#[tokio::test]
async fn encoded_slash_is_not_a_separator() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/bin%2F").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = get(&service, "/bin%2F?format=simple").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_file() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/hello.txt").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "text/plain");
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "12");
    assert_eq!(res.headers()[header::ACCEPT_RANGES], "bytes");
    assert!(res.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(text(res).await, "hello, world");
}

#[tokio::test]
async fn serves_byte_range() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let req = Request::get("/hello.txt")
        .header(header::RANGE, "bytes=7-11")
        .body(())
        .unwrap();
    let res = request(&service, req).await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 7-11/12");
    assert_eq!(text(res).await, "world");
}

#[tokio::test]
async fn not_modified() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/hello.txt").await;
    let last_modified = res.headers()[header::LAST_MODIFIED].clone();

    let req = Request::get("/hello.txt")
        .header(header::IF_MODIFIED_SINCE, last_modified)
        .body(())
        .unwrap();
    let res = request(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn head_has_no_body() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let req = Request::head("/hello.txt").body(()).unwrap();
    let res = request(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "12");
    assert_eq!(text(res).await, "");
}

#[tokio::test]
async fn other_methods_are_not_found() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/hello.txt")
        .body(())
        .unwrap();
    let res = request(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_file_is_generic_404() {
    let tmp = fixture();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/nope/secret.txt").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&res), "text/plain; charset=utf-8");
    assert_eq!(text(res).await, "404 page not found\n");
}

#[tokio::test]
async fn traversal_stays_in_root() {
    let tmp = fixture();
    let root = tmp.path().join("bin");
    let service = ServeDir::new(&root);

    // `hello.txt` 在根目录之外。
    let res = get(&service, "/../hello.txt").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = get(&service, "/lib/../../?format=simple").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await, "busybox\nlib/\n");
}

#[tokio::test]
async fn escaped_names_link_back() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a b?.txt"), "x").unwrap();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/?format=json").await;
    let listing: dirheader::Listing = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(listing.rows[0].url, "a%20b%3F.txt");

    let res = get(&service, &format!("/{}", listing.rows[0].url)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await, "x");
}

#[cfg(unix)]
#[tokio::test]
async fn broken_symlink_does_not_abort_listing() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.txt"), "a").unwrap();
    std::os::unix::fs::symlink(Path::new("/definitely/missing"), tmp.path().join("b")).unwrap();
    fs::write(tmp.path().join("c.txt"), "c").unwrap();
    let service = ServeDir::new(tmp.path());

    let res = get(&service, "/?format=json").await;
    assert_eq!(res.status(), StatusCode::OK);
    let listing: dirheader::Listing = serde_json::from_str(&text(res).await).unwrap();
    let names: Vec<_> = listing.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b", "c.txt"]);
    assert_eq!(listing.rows[1].size, 0);
    assert_eq!(listing.rows[1].date_modified, 0);
    assert!(!listing.rows[1].is_dir);
}

#[tokio::test]
async fn empty_body_type_is_usable() {
    let body = Body::empty().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}
