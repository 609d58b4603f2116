use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct MemberResponse {
    id: u32,
    name: String,
    phone: String,
    start_date: String,
    duration: String,
    end_date: String,
    renewed_on: String,
    renewals: u32,
}

#[derive(Debug, Deserialize)]
struct RenewalResponse {
    member_id: u32,
    renewal_date: String,
    duration: String,
    new_end_date: String,
}

#[derive(Debug, Deserialize)]
struct Summary {
    total: usize,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_sheet_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("gym_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/summary")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let sheet_path = unique_sheet_path();
    let child = Command::new(env!("CARGO_BIN_EXE_gym_tracker"))
        .env("PORT", port.to_string())
        .env("GYM_SHEET_PATH", sheet_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn create_member(client: &Client, base_url: &str, name: &str) -> MemberResponse {
    let response = client
        .post(format!("{base_url}/api/members"))
        .json(&serde_json::json!({
            "name": name,
            "phone": "9876500101",
            "start_date": "2024-01-15",
            "duration": "3 Months"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn member_total(client: &Client, base_url: &str) -> usize {
    let summary: Summary = client
        .get(format!("{base_url}/api/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    summary.total
}

#[tokio::test]
async fn http_member_lifecycle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let created = create_member(&client, base, "Asha").await;
    assert!(created.id >= 101);
    assert_eq!(created.start_date, "15-Jan-2024");
    assert_eq!(created.duration, "3 Months");
    assert_eq!(created.end_date, "15-Apr-2024");

    let response = client
        .patch(format!("{base}/api/members/{}", created.id))
        .json(&serde_json::json!({ "field": "Name", "value": "X" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let updated: MemberResponse = response.json().await.unwrap();
    assert_eq!(updated.name, "X");
    assert_eq!(updated.phone, created.phone);
    assert_eq!(updated.end_date, created.end_date);

    let renewal: RenewalResponse = client
        .post(format!("{base}/api/members/{}/renewals", created.id))
        .json(&serde_json::json!({ "renewal_date": "2024-01-15", "duration": "3 Months" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renewal.member_id, created.id);
    assert_eq!(renewal.renewal_date, "15-Jan-2024");
    assert_eq!(renewal.duration, "3 Months");
    assert_eq!(renewal.new_end_date, "15-Apr-2024");

    let renewed: MemberResponse = client
        .get(format!("{base}/api/members/{}", created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renewed.renewed_on, "15-Jan-2024");
    assert_eq!(renewed.renewals, 1);

    let history: Vec<RenewalResponse> = client
        .get(format!("{base}/api/members/{}/renewals", created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);

    let response = client
        .delete(format!("{base}/api/members/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{base}/api/members/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_invalid_requests_write_nothing() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let before = member_total(&client, base).await;
    let response = client
        .post(format!("{base}/api/members"))
        .json(&serde_json::json!({ "name": "  ", "phone": "123", "duration": "3 Months" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(member_total(&client, base).await, before);

    let created = create_member(&client, base, "Ravi").await;
    let response = client
        .patch(format!("{base}/api/members/{}", created.id))
        .json(&serde_json::json!({ "field": "Email", "value": "a@b.c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{base}/api/members/999999/renewals"))
        .json(&serde_json::json!({ "duration": "6 Months" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_dashboard_form_adds_member() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let before = member_total(&client, base).await;
    let response = client
        .post(format!("{base}/members"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Meena&phone=9123400000&start_date=2024-01-31&duration=6+Months")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Member added successfully!"));
    assert!(html.contains("Meena"));
    assert_eq!(member_total(&client, base).await, before + 1);

    let response = client
        .post(format!("{base}/members"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=&phone=&duration=3+Months")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("name and phone are required"));

    let search = client
        .get(format!("{base}/?q=meena"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(search.contains("31-Jul-2024"));
}
