/// Batch runs: app isolation and summaries.

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use uhg_miner::application::BatchRunner;
use uhg_miner::application::batch::list_apps;
use uhg_miner::common::EngineConfig;
use uhg_miner::infrastructure::{AppLayout, JsonBehaviorStore, KeywordLists};
use uhg_miner::ports::BehaviorStore;

const NODES: &str = "\
Name,UI,XML,UId,Package
Button,1,main.xml,42,-
<com.app.Main: void onClick(android.view.View)>,0,,-1,-
<com.app.Main: void save()>,0,,-1,-
<android.app.Activity: void finish()>,0,,-1,android.app
";

fn write_app(root: &Path, name: &str, edges: &str) -> AppLayout {
    let layout = AppLayout::new(root.join(name));
    fs::create_dir_all(layout.encoding_dir()).unwrap();
    fs::write(layout.node_table(), NODES).unwrap();
    fs::write(layout.edge_table(), edges).unwrap();
    layout
}

fn runner(config: EngineConfig) -> BatchRunner {
    let lists = KeywordLists::load(Path::new("lists")).unwrap();
    BatchRunner::with_lists(config, lists).without_progress()
}

#[test]
fn test_broken_app_does_not_abort_batch() {
    let root = tempdir().unwrap();
    let good = write_app(root.path(), "a_good", "From,To,Type\n0,1,4\n1,2,0\n2,3,0\n");
    write_app(root.path(), "b_bad_relation", "From,To,Type\n0,1,9\n");
    write_app(root.path(), "c_out_of_range", "From,To,Type\n0,17,4\n");
    fs::create_dir_all(root.path().join("d_empty")).unwrap();
    fs::write(root.path().join("not_an_app.txt"), "ignored").unwrap();

    let config = EngineConfig {
        threads: Some(2),
        ..Default::default()
    };
    let summary = runner(config).run(root.path()).unwrap();

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.processed.len(), 1);
    assert_eq!(summary.processed[0].app, "a_good");
    assert_eq!(summary.skipped, vec!["d_empty".to_string()]);
    let mut failed: Vec<&str> = summary.failed.iter().map(|f| f.app.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["b_bad_relation", "c_out_of_range"]);
    assert!(summary.failed.iter().any(|f| f.message.contains("relation code 9")));
    assert!(!summary.all_failed());

    let reduced = JsonBehaviorStore::new(&good).load_reduced().unwrap();
    assert_eq!(reduced.behaviors.len(), 1);
    assert_eq!(reduced.behaviors[0].size.edge, 3);
}

#[test]
fn test_second_batch_skips_finished_apps() {
    let root = tempdir().unwrap();
    write_app(root.path(), "app", "From,To,Type\n0,1,4\n1,2,0\n");
    let config = EngineConfig {
        threads: Some(1),
        ..Default::default()
    };
    let first = runner(config.clone()).run(root.path()).unwrap();
    assert_eq!(first.processed.len(), 1);

    let second = runner(config).run(root.path()).unwrap();
    assert_eq!(second.skipped, vec!["app".to_string()]);
    assert!(second.processed.is_empty());
}

#[test]
fn test_all_failed() {
    let root = tempdir().unwrap();
    write_app(root.path(), "bad", "From,To,Type\n0,1,9\n");
    let summary = runner(EngineConfig::default()).run(root.path()).unwrap();
    assert!(summary.all_failed());
}

#[test]
fn test_root_without_apps_is_not_a_failure() {
    let root = tempdir().unwrap();
    fs::create_dir_all(root.path().join("docs")).unwrap();
    fs::create_dir_all(root.path().join("scratch")).unwrap();
    let summary = runner(EngineConfig::default()).run(root.path()).unwrap();
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary.failed.is_empty());
    assert!(!summary.all_failed());
}

#[test]
fn test_list_apps_is_sorted() {
    let root = tempdir().unwrap();
    for name in ["zeta", "alpha", "mid"] {
        fs::create_dir_all(root.path().join(name)).unwrap();
    }
    let names: Vec<String> = list_apps(root.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert!(list_apps(&root.path().join("missing")).is_err());
}
