use go_appeals::{
    config::MapConfig,
    render::{render_appeal_density, ChoroplethMap, RenderOutcome},
    server::{router, QueryResponse},
    AppealRecord, ExclusionList,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn appeal(iso3: &str) -> AppealRecord {
    AppealRecord {
        country_iso3: Some(iso3.to_string()),
        ..Default::default()
    }
}

fn sample_map() -> ChoroplethMap {
    let config = MapConfig {
        world: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/world_sample.geojson"),
        width: 300,
        height: 330,
        ..Default::default()
    };

    let mut appeals: Vec<AppealRecord> = (0..5).map(|_| appeal("FRA")).collect();
    appeals.extend((0..2).map(|_| appeal("DEU")));

    match render_appeal_density(&appeals, &config, &ExclusionList::default()).unwrap() {
        RenderOutcome::Rendered(map) => map,
        RenderOutcome::NoData => panic!("expected a rendered map"),
    }
}

async fn spawn_viewer() -> String {
    let app = router(sample_map()).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_query_returns_country_under_point() {
    let base = spawn_viewer().await;

    let france: Option<QueryResponse> = reqwest::get(format!("{base}/api/query?lat=45&lon=5"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        france,
        Some(QueryResponse {
            iso3: Some("FRA".to_string()),
            name: Some("France".to_string()),
            count: 5,
        })
    );

    let spain: Option<QueryResponse> = reqwest::get(format!("{base}/api/query?lat=35&lon=-5"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(spain.map(|s| s.count), Some(0));

    // Antarctica is excluded from the drawing surface
    let pole: Option<QueryResponse> = reqwest::get(format!("{base}/api/query?lat=-70&lon=0"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pole, None);
}

#[tokio::test]
async fn test_counts_and_png() {
    let base = spawn_viewer().await;

    let counts: BTreeMap<String, u32> = reqwest::get(format!("{base}/api/counts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        counts,
        BTreeMap::from([("DEU".to_string(), 2), ("FRA".to_string(), 5)])
    );

    let resp = reqwest::get(format!("{base}/map.png")).await.unwrap();
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
