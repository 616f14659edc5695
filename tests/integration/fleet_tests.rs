//! Integration tests for fleets built from configuration files

use harvest_ripple::config::{build_fleet, load_config_with_hash};
use harvest_ripple::JobState;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html"),
        )
        .mount(server)
        .await;
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fleet_from_config_runs_all_jobs() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&first, "/", r#"<p>First site.</p><a href="/next">next</a>"#).await;
    mount_page(&first, "/next", "<p>First again.</p><p>Year 1999</p>").await;
    mount_page(&second, "/", r#"<p>Second site.</p><a href="/next">next</a>"#).await;
    mount_page(&second, "/next", "<p>Year 2024</p>").await;

    let config_file = write_config(&format!(
        r#"
[crawler]
rate-limit-cooldown-ms = 100
idle-wait-ms = 10

[output]
directory = "{dir}"

[[job]]
start-url = "{first}/"
threads = 2
options = ["save-parsed-elements", "save-links"]

[[job.pattern]]
name = "sentences"
pattern = '[A-Z][a-z ]*[.!?]'

[[job.pattern]]
name = "years"
pattern = 'Year (\d{{4}})'
transform = "visible-text"

[[job]]
start-url = "{second}/"
options = ["save-parsed-elements"]

[[job.pattern]]
name = "years"
pattern = 'Year (\d{{4}})'
transform = "visible-text"
"#,
        dir = dir.path().display(),
        first = first.uri(),
        second = second.uri(),
    ));

    let (config, hash) = load_config_with_hash(config_file.path()).unwrap();
    let fleet = build_fleet(&config, Some(hash.clone())).unwrap();
    assert_eq!(fleet.len(), 2);

    assert_eq!(fleet.start_all().await, 2);
    tokio::time::timeout(Duration::from_secs(20), fleet.wait_all())
        .await
        .expect("Fleet did not finish in time");
    assert_eq!(fleet.running_count(), 0);

    let jobs = fleet.list_jobs();
    assert!(jobs.iter().all(|job| job.state == JobState::Closed));

    let mut years: Vec<String> = std::fs::read_to_string(dir.path().join("years.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    years.sort();
    assert_eq!(years, vec!["1999", "2024"]);

    let sentences = std::fs::read_to_string(dir.path().join("sentences.txt")).unwrap();
    assert_eq!(sentences.lines().count(), 2);

    let report = fleet.report();
    let markdown = report.to_markdown();
    assert!(markdown.contains(&hash));
    assert!(markdown.contains(&jobs[0].label));
    assert!(markdown.contains("| years |"));
}

#[tokio::test]
async fn test_start_all_skips_unreachable_jobs() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/", r#"<p>Only site.</p><a href="/x">x</a>"#).await;

    let config_file = write_config(&format!(
        r#"
[output]
directory = "{dir}"

[[job]]
start-url = "{uri}/"

[[job.pattern]]
name = "sentences"
standard = "text"

[[job]]
start-url = "{uri}/missing"

[[job.pattern]]
name = "sentences"
standard = "text"
"#,
        dir = dir.path().display(),
        uri = server.uri(),
    ));

    let (config, _) = load_config_with_hash(config_file.path()).unwrap();
    let fleet = build_fleet(&config, None).unwrap();

    assert_eq!(fleet.start_all().await, 1);
    tokio::time::timeout(Duration::from_secs(20), fleet.wait_all())
        .await
        .expect("Fleet did not finish in time");

    let states: Vec<JobState> = fleet.list_jobs().iter().map(|j| j.state).collect();
    assert_eq!(states, vec![JobState::Closed, JobState::Idle]);
}
