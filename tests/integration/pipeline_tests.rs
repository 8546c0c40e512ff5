use std::sync::Arc;

use scriptpack::packager::progress::{ProgressSink, ProgressTracker};
use scriptpack::packager::{Severity, descriptor};

use super::fixture::{
    FakeBuild, FakeBundler, Fixture, capture_logs, event_names, packager, zip_entries,
};

#[tokio::test]
async fn full_run_archives_every_script() {
    let fx = Fixture::new();
    let a_info = fx.add_static("a.js", &[]);
    let b_info = fx.add_static("b.js", &["a.js"]);
    let build = Arc::new(FakeBuild::default());
    let bundler = Arc::new(FakeBundler::default());
    let (packager, log) = packager(&fx, build.clone(), bundler.clone());

    let summary = packager.run().await.unwrap();

    assert_eq!(build.calls.lock().unwrap().len(), 1);
    assert_eq!(bundler.call_count(), 1);
    assert_eq!(bundler.keys(0), vec!["a", "b"]);
    assert_eq!(summary.packaged.len(), 2);
    assert!(summary.ignored.is_empty());

    for (name, info) in [("a", &a_info), ("b", &b_info)] {
        let zip = fx.target().join(format!("{name}.zip"));
        let entries = zip_entries(&zip);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["package.json".to_string(), format!("{name}.js")]);
        assert!(entries[1].1.contains("/* bundled */"));

        let manifest: serde_json::Value = serde_json::from_str(&entries[0].1).unwrap();
        assert_eq!(manifest["name"], name);
        assert_eq!(manifest["main"], format!("{name}.js"));

        let persisted = fx.read_info(info);
        let size = std::fs::metadata(&zip).unwrap().len();
        assert_eq!(persisted["archiveSize"], size);
        assert!(size > 0);
    }

    let b = fx.read_info(&b_info);
    assert_eq!(b["requires"], serde_json::json!(["a.js"]));
    assert_eq!(
        event_names(&log),
        vec![
            ("create-package".to_string(), "a".to_string()),
            ("create-package".to_string(), "b".to_string()),
        ]
    );
}

#[tokio::test]
async fn transitive_requires_are_flattened_before_persisting() {
    let fx = Fixture::new();
    fx.add_static("a.js", &["b.js"]);
    fx.add_static("b.js", &["c.js"]);
    let c_info = fx.add_static("c.js", &[]);
    let (packager, _) = packager(
        &fx,
        Arc::new(FakeBuild::default()),
        Arc::new(FakeBundler::default()),
    );

    let summary = packager.run().await.unwrap();

    let a = &summary.packaged[0];
    assert_eq!(a.name, "a");
    assert_eq!(a.requires, vec!["b.js", "c.js"]);
    assert_eq!(fx.read_info(&c_info)["requires"], serde_json::json!([]));
}

#[tokio::test]
async fn regular_scripts_get_their_own_directory() {
    let fx = Fixture::new();
    let info = fx.add_regular("lib/web.js", &[]);
    let bundler = Arc::new(FakeBundler::default());
    let (packager, _) = packager(&fx, Arc::new(FakeBuild::default()), bundler.clone());

    packager.run().await.unwrap();

    assert_eq!(bundler.keys(0), vec!["web/web"]);
    let zip = fx.target().join("web").join("web.zip");
    let entries = zip_entries(&zip);
    assert_eq!(entries[1].0, "web.js");

    let persisted = fx.read_info(&info);
    assert_eq!(persisted["dirname"], "web");
    assert_eq!(persisted["zipFile"], &*zip.to_string_lossy());
}

#[tokio::test]
async fn empty_target_is_a_quiet_noop() {
    let fx = Fixture::new();
    let bundler = Arc::new(FakeBundler::default());
    let (packager, log) = packager(&fx, Arc::new(FakeBuild::default()), bundler.clone());

    let summary = packager.run().await.unwrap();

    assert!(summary.is_noop());
    assert!(summary.diagnostics.is_empty());
    assert_eq!(bundler.call_count(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bundler_warnings_are_reported_not_fatal() {
    let fx = Fixture::new();
    fx.add_static("a.js", &[]);
    let bundler = Arc::new(FakeBundler::with_warnings(&["[WARNING] unused variable"]));
    let (packager, _) = packager(&fx, Arc::new(FakeBuild::default()), bundler);
    let (logs, _guard) = capture_logs();

    let summary = packager.run().await.unwrap();

    assert_eq!(summary.packaged.len(), 1);
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].severity, Severity::Warning);
    assert!(fx.target().join("a.zip").exists());

    let output = logs.contents();
    assert_eq!(output.matches("[WARNING] unused variable").count(), 1);
    assert_eq!(output.matches("bundler warning").count(), 1);
}

#[tokio::test]
async fn build_sources_are_forwarded() {
    let fx = Fixture::new();
    let mut options = fx.options();
    options.sources = vec!["src/a.ts".to_string()];
    let build = Arc::new(FakeBuild::default());
    let (packager, _) = super::fixture::packager_with(
        options,
        build.clone(),
        Arc::new(FakeBundler::default()),
    );

    packager.run().await.unwrap();

    let calls = build.calls.lock().unwrap();
    assert_eq!(calls[0].0, fx.target());
    assert_eq!(calls[0].1, vec!["src/a.ts"]);
}

#[tokio::test]
async fn second_full_run_is_byte_identical() {
    let fx = Fixture::new();
    fx.add_static("a.js", &[]);
    let (packager, _) = packager(
        &fx,
        Arc::new(FakeBuild::default()),
        Arc::new(FakeBundler::default()),
    );

    packager.run().await.unwrap();
    let first = std::fs::read(fx.target().join("a.zip")).unwrap();
    packager.run().await.unwrap();
    let second = std::fs::read(fx.target().join("a.zip")).unwrap();

    assert_eq!(first, second);
    assert_eq!(descriptor::load_all(fx.target()).await.unwrap().len(), 1);
}

#[derive(Default)]
struct Fractions(parking_lot::Mutex<Vec<f64>>);

impl ProgressSink for Fractions {
    fn report(&self, fraction: f64, _label: &str) {
        self.0.lock().push(fraction);
    }
}

#[tokio::test]
async fn progress_splits_bundling_and_archiving() {
    let fx = Fixture::new();
    fx.add_static("a.js", &[]);
    fx.add_static("b.js", &[]);
    let sink = Arc::new(Fractions::default());
    let (packager, _) = packager(
        &fx,
        Arc::new(FakeBuild::default()),
        Arc::new(FakeBundler::default()),
    );
    let packager = packager.with_progress(sink.clone());

    packager.run().await.unwrap();

    let fractions = sink.0.lock().clone();
    let bundled = fractions
        .iter()
        .position(|f| (*f - 0.8).abs() < f64::EPSILON)
        .unwrap();
    assert!(fractions[..=bundled].windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions[bundled..].iter().all(|f| *f >= 0.8));
    let max = fractions.iter().copied().fold(0.0_f64, f64::max);
    assert!((max - 1.0).abs() < f64::EPSILON);
    assert_eq!(ProgressTracker::noop(2).total(), 20);
}
