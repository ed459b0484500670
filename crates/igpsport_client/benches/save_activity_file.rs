use criterion::{Criterion, criterion_group, criterion_main};
use igpsport_client::{FileSink, HttpFileSink, OutputLayout};
use tempfile::tempdir;
use tokio::runtime::Builder;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bench_save_activity_file(c: &mut Criterion) {
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let server = rt.block_on(async {
        let server = MockServer::start().await;
        let body = vec![7u8; 256 * 1024]; // 256KB, roughly a long ride exported as fit
        Mock::given(method("GET"))
            .and(path("/oss/1.fit"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        server
    });

    let url = format!("{}/oss/1.fit", server.uri());
    c.bench_function("save_activity_file_stream", |b| {
        b.to_async(&rt).iter(|| {
            let tmpdir = tempdir().expect("tempdir");
            let sink = HttpFileSink::new(OutputLayout::under(tmpdir.path())).expect("sink");
            let url = url.clone();
            async move {
                let _hold_dir = tmpdir; // keep tempdir alive until future completes
                let path = sink.save(&url, "1", "fit").await.expect("save");
                let _ = tokio::fs::metadata(&path).await.expect("metadata");
            }
        })
    });
}

criterion_group!(benches, bench_save_activity_file);
criterion_main!(benches);
