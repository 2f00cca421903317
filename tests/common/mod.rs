use kimovil_scraper::ScrapeConfig;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LISTING_PATH: &str = "/en/compare-smartphones";

/// Catalog body whose `filters` markup lists the given (name, id) pairs
pub fn catalog_body(processors: &[(&str, &str)]) -> Value {
    let mut filters = String::from(r#"<div class="filter-group"><ul>"#);
    for (name, id) in processors {
        filters.push_str(&format!(
            r#"<li><label data-for="f_dpg+id" value="{}">{}</label></li>"#,
            id, name
        ));
    }
    filters.push_str(r#"<li><label data-for="f_brand" value="1">Samsung</label></li></ul></div>"#);
    json!({ "filters": filters })
}

/// Listing page holding `models`, pointing at the 1-based `next_page`
pub fn listing_page(models: &[&str], next_page: u32) -> Value {
    let content: String = models
        .iter()
        .map(|m| {
            format!(
                r#"<li class="item"><div class="device-name"><a href="/p">{}</a></div><span class="price">199 €</span></li>"#,
                m
            )
        })
        .collect();
    json!({
        "page_results": models.len(),
        "content": format!("<ul>{}</ul>", content),
        "next_page_url": format!("https://www.kimovil.com/en/compare-smartphones/f_dpg+id.42,page.{}", next_page),
    })
}

pub fn empty_page() -> Value {
    json!({ "page_results": 0, "content": "", "next_page_url": null })
}

/// Path of one listing request, as built by the client
pub fn listing_path(id: &str, band: &str, page: u32) -> String {
    let mut p = format!("{}/f_dpg+id.{}", LISTING_PATH, id);
    if !band.is_empty() {
        p.push(',');
        p.push_str(band);
    }
    if page > 0 {
        p.push_str(&format!(",page.{}", page + 1));
    }
    p
}

pub async fn mount_catalog(server: &MockServer, processors: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("xhr", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(processors)))
        .mount(server)
        .await;
}

pub async fn mount_listing(server: &MockServer, id: &str, band: &str, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(listing_path(id, band, page)))
        .and(query_param("xhr", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Config pointed at the mock server with no pacing delays
pub fn test_config(server: &MockServer, processors: &[&str], bands: &[&str]) -> ScrapeConfig {
    let mut config = ScrapeConfig::new(
        processors.iter().map(|s| s.to_string()).collect(),
        bands.iter().map(|s| s.to_string()).collect(),
    );
    config.base_url = server.uri();
    config.fetch_delay_ms = 0;
    config.fetch_retry_ms = 0;
    config.request_timeout_secs = 5;
    config
}

pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}
